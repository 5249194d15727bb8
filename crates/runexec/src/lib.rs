//! Run support for Vanilla Studio: per-language recipes, PATH probing and
//! sequential process execution on a background worker.
//! （依語言配方、PATH 探測與背景執行外部程序。）
//!
//! [`RunDispatcher`] resolves a [`RunPlan`] for a saved file, checks that the
//! required tools are present without spawning anything, then runs each step
//! through a [`ProcessRunner`], appending captured output to an
//! [`OutputSink`]. Compile failures stop the chain; a [`StopFlag`] is
//! consulted before every step.

mod dispatch;
mod executor;
mod plan;
mod probe;

pub use dispatch::{
    BrowserLauncher, Console, OutputSink, ProcessRunner, RunDispatcher, RunOutcome, RunReport,
    StopFlag, SystemBrowser, SystemRunner, DEFAULT_TIMEOUT,
};
pub use executor::{RunError, RunExecutor, RunResult, RunSpec};
pub use plan::{
    recipe_for, ActionTemplate, Condition, PlannedAction, PlannedStep, Recipe, RunPlan, StepRole,
    StepTemplate,
};
pub use probe::{PathProbe, ToolProbe};
