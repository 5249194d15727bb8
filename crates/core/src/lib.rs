//! 編輯核心：緩衝區、編輯輔助、文件與分頁。
//! Editing core: buffer, editing aids, documents and tabs.

pub mod debounce;
pub mod document;
pub mod editing;
pub mod editor;
pub mod tab;

pub use debounce::Debouncer;
pub use document::{enforce_extension, gutter_text, line_count, Document, DocumentError};
pub use editing::{backspace, indent, newline_with_indent, toggle_comment, type_char, INDENT_UNIT};
pub use editor::{Caret, EditOperation, EditorBuffer, EditorError, Selection};
pub use tab::{EditKey, EditorTab, PollOutcome, GUTTER_DEBOUNCE, HIGHLIGHT_DEBOUNCE};
