use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;
use vanilla_highlight::{LanguageId, TextPosition};

use crate::editor::EditorBuffer;

/// 文件載入或儲存時可能發生的錯誤。 / Errors that can occur while loading or saving a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not valid UTF-8 text")]
    InvalidUtf8(PathBuf),
    #[error("document has no associated path")]
    NoPath,
}

/// 編輯中的 UTF-8 文件，語言在建立時決定。 / A UTF-8 document whose language is fixed when the tab is created.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    language: LanguageId,
    title: String,
    buffer: EditorBuffer,
    is_dirty: bool,
}

impl Document {
    /// 建立含範例程式的未命名文件。 / Creates an untitled document seeded with the language's sample.
    pub fn untitled(language: LanguageId) -> Self {
        Self {
            path: None,
            language,
            title: format!("untitled{}", language.extension()),
            buffer: EditorBuffer::new(language.profile().sample),
            is_dirty: false,
        }
    }

    /// 從磁碟載入，語言由副檔名推定。 / Loads a UTF-8 file; the language comes from its extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path_ref = path.as_ref();
        let bytes = fs::read(path_ref).map_err(|source| DocumentError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let contents =
            String::from_utf8(bytes).map_err(|_| DocumentError::InvalidUtf8(path_ref.to_path_buf()))?;
        let extension = path_ref
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or_default();

        Ok(Self {
            path: Some(path_ref.to_path_buf()),
            language: LanguageId::from_extension(extension),
            title: file_title(path_ref),
            buffer: EditorBuffer::new(contents),
            is_dirty: false,
        })
    }

    /// 開啟檔案但指定語言，忽略副檔名。 / Opens a file with an explicit language instead of the extension's.
    pub fn open_as(path: impl AsRef<Path>, language: LanguageId) -> Result<Self, DocumentError> {
        let mut document = Self::open(path)?;
        document.language = language;
        Ok(document)
    }

    /// 儲存至目前路徑。 / Saves to the current path; untitled documents fail with [`DocumentError::NoPath`].
    pub fn save(&mut self) -> Result<PathBuf, DocumentError> {
        let path = self.path.clone().ok_or(DocumentError::NoPath)?;
        self.save_as(path)
    }

    /// 另存新檔並強制正確副檔名，回傳實際寫入的路徑。 / Saves under a new path with the canonical extension enforced, returning the path written.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<PathBuf, DocumentError> {
        let target = enforce_extension(path.as_ref(), self.language);
        write_atomically(&target, self.buffer.contents().as_bytes()).map_err(|source| {
            DocumentError::Write {
                path: target.clone(),
                source,
            }
        })?;
        tracing::debug!(path = %target.display(), "document saved");

        self.title = file_title(&target);
        self.path = Some(target.clone());
        self.is_dirty = false;
        Ok(target)
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_untitled(&self) -> bool {
        self.path.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn contents(&self) -> &str {
        self.buffer.contents()
    }

    pub fn buffer(&self) -> &EditorBuffer {
        &self.buffer
    }

    /// 取得可變緩衝區並標記為已修改。 / Mutable buffer access; marks the document dirty.
    pub fn buffer_mut(&mut self) -> &mut EditorBuffer {
        self.is_dirty = true;
        &mut self.buffer
    }

    /// 以新文字取代內容。 / Replaces the whole text, marking the document dirty.
    pub fn set_contents(&mut self, text: impl Into<String>) {
        self.buffer.set_contents(text);
        self.is_dirty = true;
    }

    /// 行數為換行數加一。 / Number of `\n` characters plus one.
    pub fn line_count(&self) -> usize {
        line_count(self.contents())
    }

    /// 行號欄文字。 / Gutter text, `1\n2\n…\nN`.
    pub fn gutter(&self) -> String {
        gutter_text(self.line_count())
    }

    /// 尋找第一個符合處（字元位移）並選取。 / Finds and selects the first occurrence of `needle`.
    pub fn find(&mut self, needle: &str) -> Option<Range<usize>> {
        if needle.is_empty() {
            return None;
        }
        let byte_start = self.contents().find(needle)?;
        let byte_end = byte_start + needle.len();
        let char_start = self.contents()[..byte_start].chars().count();
        let char_end = char_start + needle.chars().count();
        // 選取不影響內容，不設 dirty。 / Selection alone does not dirty the document.
        self.buffer.select(byte_start, byte_end).ok()?;
        Some(char_start..char_end)
    }

    /// 字元位移轉為行列。 / Line/column of a char offset in the current text.
    pub fn position_of(&self, offset: usize) -> TextPosition {
        TextPosition::from_char_offset(self.contents(), offset)
    }
}

/// 依語言修正副檔名（補上或取代）。 / Appends or replaces the suffix so it matches the language.
pub fn enforce_extension(path: &Path, language: LanguageId) -> PathBuf {
    let expected = language.extension().trim_start_matches('.');
    match path.extension().and_then(OsStr::to_str) {
        Some(current) if current.eq_ignore_ascii_case(expected) => path.to_path_buf(),
        _ => path.with_extension(expected),
    }
}

pub fn line_count(text: &str) -> usize {
    text.matches('\n').count() + 1
}

pub fn gutter_text(lines: usize) -> String {
    (1..=lines.max(1))
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    // 先寫入暫存檔再重新命名。 / Write to a sibling temp file, then rename over the target.
    let tmp_path = path.with_extension("tmp_vanilla");
    {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}
