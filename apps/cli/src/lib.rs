//! Vanilla Studio 應用層：分頁、工作區與執行控制。 / Application layer for Vanilla Studio: tabs, workspace and run control.

pub mod app;

pub use app::{CloseOutcome, StudioApp};
