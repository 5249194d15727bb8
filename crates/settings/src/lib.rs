//! Persistent preferences for Vanilla Studio (JSON on disk).
//! 以 JSON 儲存的使用者偏好設定。

pub mod preferences;

pub use preferences::{
    EditorPreferences, HighlightPreferences, Preferences, PreferencesError, PreferencesStore,
    RunPreferences, WorkspacePreferences,
};
