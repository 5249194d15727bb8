use thiserror::Error;

/// 描述插入點與可選的選取範圍。 / Represents the insertion caret (optional selection).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caret {
    position: usize,
    selection: Option<Selection>,
}

impl Caret {
    /// 建立指定位置的游標。 / Creates a caret at the given position.
    pub fn new(position: usize) -> Self {
        Self {
            position,
            selection: None,
        }
    }

    /// 建立帶有選取範圍的游標。 / Creates a caret with the provided selection range.
    pub fn with_selection(position: usize, selection: Selection) -> Self {
        let selection = (!selection.is_empty()).then_some(selection);
        Self {
            position,
            selection,
        }
    }

    /// 取得游標所在位置。 / Returns the caret position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// 取得選取範圍（若有）。 / Returns the active selection if present.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    fn edit_range(&self) -> (usize, usize) {
        if let Some(selection) = &self.selection {
            (selection.start, selection.end)
        } else {
            (self.position, self.position)
        }
    }
}

/// 定義一段已排序（start <= end）的文字範圍。 / Represents an ordered selection range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    start: usize,
    end: usize,
}

impl Selection {
    /// 建立新的選取範圍，會自動將 start/end 排序。 / Creates a selection with automatically ordered bounds.
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// 範圍起點。 / Returns the start of the selection.
    pub fn start(&self) -> usize {
        self.start
    }

    /// 範圍終點。 / Returns the end of the selection.
    pub fn end(&self) -> usize {
        self.end
    }

    /// 選取長度。 / Returns the length of the selection.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 編輯器緩衝區錯誤。 / Error conditions exposed by the editing buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("caret index {index} is out of bounds for buffer of length {len}")]
    CaretOutOfBounds { index: usize, len: usize },
    #[error("index {0} is not on a character boundary")]
    NotCharBoundary(usize),
    #[error("edit operations overlap and cannot be applied safely")]
    OverlappingEdits,
}

/// 描述一段待取代的編輯操作（位元組位移）。 / Replacement of a byte range within the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditOperation {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl EditOperation {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: String::new(),
        }
    }
}

/// 具備單一游標與選取的文字緩衝。 / Text buffer with a single caret and optional selection.
///
/// Offsets are byte indices into the UTF-8 contents and always sit on
/// character boundaries.
#[derive(Debug, Clone)]
pub struct EditorBuffer {
    contents: String,
    caret: Caret,
}

impl EditorBuffer {
    /// 從給定文字建立緩衝區，游標位於開頭。 / Creates a buffer with the caret at the start.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            contents: text.into(),
            caret: Caret::new(0),
        }
    }

    /// 以指定游標建立緩衝區。 / Creates a buffer with an explicit caret.
    pub fn with_caret(text: impl Into<String>, caret: Caret) -> Result<Self, EditorError> {
        let mut buffer = Self::new(text);
        buffer.set_caret(caret)?;
        Ok(buffer)
    }

    /// 取得目前的內容。 / Returns the current buffer contents.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// 以新內容取代全部文字並將游標移至開頭。 / Replaces all text and resets the caret.
    pub fn set_contents(&mut self, text: impl Into<String>) {
        self.contents = text.into();
        self.caret = Caret::new(0);
    }

    pub fn caret(&self) -> &Caret {
        &self.caret
    }

    pub fn position(&self) -> usize {
        self.caret.position
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.caret.selection.as_ref()
    }

    /// 取得選取的文字。 / Returns the selected text, if any.
    pub fn selected_text(&self) -> Option<&str> {
        self.selection()
            .map(|selection| &self.contents[selection.start..selection.end])
    }

    pub fn set_caret(&mut self, caret: Caret) -> Result<(), EditorError> {
        let (start, end) = caret.edit_range();
        for index in [start, end, caret.position] {
            self.check_index(index)?;
        }
        if caret.position < start || caret.position > end {
            return Err(EditorError::CaretOutOfBounds {
                index: caret.position,
                len: self.contents.len(),
            });
        }
        self.caret = caret;
        Ok(())
    }

    /// 移動游標並清除選取。 / Moves the caret, dropping any selection.
    pub fn move_to(&mut self, position: usize) -> Result<(), EditorError> {
        self.set_caret(Caret::new(position))
    }

    /// 選取範圍，游標置於 `to`。 / Selects `from..to` with the caret at `to`.
    pub fn select(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        self.set_caret(Caret::with_selection(to, Selection::new(from, to)))
    }

    /// 以文字取代選取（或插入於游標）。 / Replaces the selection, or inserts at the caret.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        let (start, end) = self.caret.edit_range();
        self.contents.replace_range(start..end, text);
        self.caret = Caret::new(start + text.len());
        Ok(())
    }

    /// 模擬 Backspace：若有選取則刪除選取，否則刪除游標前一個字元。 / Simulates a plain backspace.
    pub fn delete_backward(&mut self) -> Result<(), EditorError> {
        let (start, end) = self.caret.edit_range();
        if start != end {
            self.contents.replace_range(start..end, "");
            self.caret = Caret::new(start);
            return Ok(());
        }
        if let Some(prev) = prev_char_boundary(&self.contents, start) {
            self.contents.replace_range(prev..start, "");
            self.caret = Caret::new(prev);
        }
        Ok(())
    }

    /// 游標前的 `count` 個字元（不足時回傳 None）。 / The `count` characters before the caret.
    pub fn chars_before(&self, count: usize) -> Option<&str> {
        let position = self.caret.position;
        let mut start = position;
        for _ in 0..count {
            start = prev_char_boundary(&self.contents, start)?;
        }
        Some(&self.contents[start..position])
    }

    /// 游標後的一個字元。 / The character right after the caret.
    pub fn char_after(&self) -> Option<char> {
        self.contents[self.caret.position..].chars().next()
    }

    /// 直接套用一組不重疊的編輯操作。 / Applies non-overlapping edit operations.
    ///
    /// The caret is remapped through the edits; callers that need a specific
    /// caret afterwards set it explicitly.
    pub fn apply_edit_plan(&mut self, mut operations: Vec<EditOperation>) -> Result<(), EditorError> {
        if operations.is_empty() {
            return Ok(());
        }
        operations.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
        for window in operations.windows(2) {
            if window[0].end > window[1].start {
                return Err(EditorError::OverlappingEdits);
            }
        }
        for op in &operations {
            self.check_index(op.start)?;
            self.check_index(op.end)?;
        }

        let (sel_start, sel_end) = self.caret.edit_range();
        let remap = |index: usize| -> usize {
            let mut shifted = index as isize;
            for op in &operations {
                if op.end <= index {
                    shifted += op.text.len() as isize - (op.end - op.start) as isize;
                } else if op.start < index {
                    shifted -= (index - op.start) as isize;
                }
            }
            shifted.max(0) as usize
        };
        let new_position = remap(self.caret.position);
        let new_start = remap(sel_start);
        let new_end = remap(sel_end);

        for op in operations.iter().rev() {
            self.contents.replace_range(op.start..op.end, &op.text);
        }

        let len = self.contents.len();
        self.caret = if self.caret.selection.is_some() {
            Caret::with_selection(
                new_position.min(len),
                Selection::new(new_start.min(len), new_end.min(len)),
            )
        } else {
            Caret::new(new_position.min(len))
        };
        Ok(())
    }

    /// 取得位移所在行的起點。 / Byte offset where the line containing `index` starts.
    pub fn line_start(&self, index: usize) -> usize {
        self.contents[..index.min(self.contents.len())]
            .rfind('\n')
            .map_or(0, |newline| newline + 1)
    }

    /// 取得位移所在行的終點（不含換行）。 / Byte offset where that line ends, newline excluded.
    pub fn line_end(&self, index: usize) -> usize {
        let index = index.min(self.contents.len());
        self.contents[index..]
            .find('\n')
            .map_or(self.contents.len(), |newline| index + newline)
    }

    /// 取得涵蓋範圍的各行起點。 / Start offsets of every line touched by `start..=end`.
    pub fn line_starts_between(&self, start: usize, end: usize) -> Vec<usize> {
        let mut starts = vec![self.line_start(start)];
        let end = end.min(self.contents.len());
        for (offset, _) in self.contents[start.min(end)..end].match_indices('\n') {
            starts.push(start + offset + 1);
        }
        starts
    }

    fn check_index(&self, index: usize) -> Result<(), EditorError> {
        if index > self.contents.len() {
            return Err(EditorError::CaretOutOfBounds {
                index,
                len: self.contents.len(),
            });
        }
        if !self.contents.is_char_boundary(index) {
            return Err(EditorError::NotCharBoundary(index));
        }
        Ok(())
    }
}

fn prev_char_boundary(text: &str, index: usize) -> Option<usize> {
    if index == 0 || index > text.len() {
        return None;
    }
    text[..index].char_indices().last().map(|(idx, _)| idx)
}
