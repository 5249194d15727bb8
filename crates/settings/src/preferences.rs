use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vanilla_highlight::{parse_highlight_palette, HighlightPalette, LanguageId, Strategy, ThemeParseError};

const PREFERENCES_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub editor: EditorPreferences,
    #[serde(default)]
    pub run: RunPreferences,
    #[serde(default)]
    pub workspace: WorkspacePreferences,
    #[serde(default)]
    pub highlight: HighlightPreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            editor: EditorPreferences::default(),
            run: RunPreferences::default(),
            workspace: WorkspacePreferences::default(),
            highlight: HighlightPreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.editor.sanitize();
        self.run.sanitize();
        self.workspace.sanitize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPreferences {
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
    #[serde(default = "default_highlight_debounce")]
    pub highlight_debounce_ms: u64,
    #[serde(default = "default_line_number_debounce")]
    pub line_number_debounce_ms: u64,
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_indent_width() -> usize {
    4
}

fn default_highlight_debounce() -> u64 {
    150
}

fn default_line_number_debounce() -> u64 {
    50
}

fn default_language() -> String {
    LanguageId::Python.as_str().to_string()
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
            highlight_debounce_ms: default_highlight_debounce(),
            line_number_debounce_ms: default_line_number_debounce(),
            default_language: default_language(),
        }
    }
}

impl EditorPreferences {
    fn sanitize(&mut self) {
        if self.indent_width == 0 {
            self.indent_width = default_indent_width();
        }
        self.indent_width = self.indent_width.clamp(1, 16);
        self.highlight_debounce_ms = self.highlight_debounce_ms.min(5_000);
        self.line_number_debounce_ms = self.line_number_debounce_ms.min(5_000);
        match self.default_language.parse::<LanguageId>() {
            Ok(language) => self.default_language = language.as_str().to_string(),
            Err(_) => {
                tracing::warn!(value = %self.default_language, "unknown default language; using python");
                self.default_language = default_language();
            }
        }
    }

    /// 新分頁使用的語言。 / Language for new tabs.
    pub fn language(&self) -> LanguageId {
        self.default_language.parse().unwrap_or(LanguageId::Python)
    }

    pub fn highlight_debounce(&self) -> Duration {
        Duration::from_millis(self.highlight_debounce_ms)
    }

    pub fn line_number_debounce(&self) -> Duration {
        Duration::from_millis(self.line_number_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPreferences {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for RunPreferences {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RunPreferences {
    fn sanitize(&mut self) {
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.timeout_secs = self.timeout_secs.min(3_600);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePreferences {
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
}

fn default_tree_depth() -> usize {
    3
}

impl Default for WorkspacePreferences {
    fn default() -> Self {
        Self {
            tree_depth: default_tree_depth(),
        }
    }
}

impl WorkspacePreferences {
    fn sanitize(&mut self) {
        self.tree_depth = self.tree_depth.min(16);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightPreferences {
    #[serde(default)]
    pub strategy: Strategy,
    /// Category name to `#rrggbb` overrides for terminal colouring.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub palette: BTreeMap<String, String>,
}

impl HighlightPreferences {
    /// 套用覆寫後的配色。 / Palette with the configured overrides applied.
    pub fn palette(&self) -> Result<HighlightPalette, ThemeParseError> {
        if self.palette.is_empty() {
            return Ok(HighlightPalette::default());
        }
        let value = serde_json::Value::Object(
            self.palette
                .iter()
                .map(|(name, color)| (name.clone(), serde_json::Value::String(color.clone())))
                .collect(),
        );
        parse_highlight_palette(&value)
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    /// 檔案不存在時回傳預設值。 / Loads preferences, falling back to defaults when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no preferences file; using defaults");
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    /// 先寫暫存檔再重新命名。 / Writes atomically through a temp file and rename.
    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
