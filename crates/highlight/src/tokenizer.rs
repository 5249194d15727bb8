use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::LanguageId;

/// 語法標記的視覺分類。 / Visual category attached to a highlighted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Keyword,
    Builtin,
    Comment,
    String,
    Number,
    Operator,
    Tag,
    Attribute,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Keyword,
        Category::Builtin,
        Category::Comment,
        Category::String,
        Category::Number,
        Category::Operator,
        Category::Tag,
        Category::Attribute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Keyword => "keyword",
            Category::Builtin => "builtin",
            Category::Comment => "comment",
            Category::String => "string",
            Category::Number => "number",
            Category::Operator => "operator",
            Category::Tag => "tag",
            Category::Attribute => "attribute",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 以字元位移表示的半開區間與分類。 / Half-open character range `[start, end)` tagged with a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub range: Range<usize>,
    pub category: Category,
}

impl Span {
    pub fn new(range: Range<usize>, category: Category) -> Self {
        Self { range, category }
    }

    pub fn len(&self) -> usize {
        self.range.end.saturating_sub(self.range.start)
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// 取得區間起點的行列位置。 / Line/column of the span start within `text`.
    pub fn start_position(&self, text: &str) -> TextPosition {
        TextPosition::from_char_offset(text, self.range.start)
    }

    /// 取得區間終點的行列位置。 / Line/column of the span end within `text`.
    pub fn end_position(&self, text: &str) -> TextPosition {
        TextPosition::from_char_offset(text, self.range.end)
    }
}

/// 以 1 為起點的行號與以 0 為起點的欄位。 / One-based line, zero-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    /// 計算字元位移前的換行數以得到行列。 / Counts newlines before `offset` to obtain line and column.
    pub fn from_char_offset(text: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 0;
        for ch in text.chars().take(offset) {
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.column)
    }
}

/// 分詞或語言解析時可能發生的錯誤。 / Errors surfaced by tokenizers and language lookups.
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("unknown language '{0}'")]
    UnknownLanguage(String),
    #[error("external tokenizer failed: {0}")]
    External(String),
    #[error("tokenizer consumed {consumed} bytes of {expected}")]
    LengthMismatch { consumed: usize, expected: usize },
}

/// 給定文字與語言，產生不重疊的標記區間。 / Produces non-overlapping spans for a document.
pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn tokenize(&self, text: &str, language: LanguageId) -> Result<Vec<Span>, HighlightError>;
}

/// Paints categories over byte ranges, last write wins, then folds runs into
/// character spans so the result never overlaps.
pub(crate) struct SpanPainter<'a> {
    text: &'a str,
    cells: Vec<Option<Category>>,
}

impl<'a> SpanPainter<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            cells: vec![None; text.len()],
        }
    }

    pub(crate) fn paint(&mut self, range: Range<usize>, category: Category) {
        let end = range.end.min(self.cells.len());
        let start = range.start.min(end);
        for cell in &mut self.cells[start..end] {
            *cell = Some(category);
        }
    }

    pub(crate) fn finish(self) -> Vec<Span> {
        let mut spans: Vec<Span> = Vec::new();
        let mut current: Option<(usize, Category)> = None;
        let mut char_index = 0;
        for (byte_index, _) in self.text.char_indices() {
            let cell = self.cells[byte_index];
            match (current, cell) {
                (Some((_, active)), Some(next)) if active == next => {}
                (Some((start, active)), next) => {
                    spans.push(Span::new(start..char_index, active));
                    current = next.map(|category| (char_index, category));
                }
                (None, next) => {
                    current = next.map(|category| (char_index, category));
                }
            }
            char_index += 1;
        }
        if let Some((start, active)) = current {
            spans.push(Span::new(start..char_index, active));
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_counts_newlines() {
        let text = "ab\ncd\nef";
        assert_eq!(
            TextPosition::from_char_offset(text, 0),
            TextPosition { line: 1, column: 0 }
        );
        assert_eq!(
            TextPosition::from_char_offset(text, 2),
            TextPosition { line: 1, column: 2 }
        );
        assert_eq!(
            TextPosition::from_char_offset(text, 3),
            TextPosition { line: 2, column: 0 }
        );
        assert_eq!(
            TextPosition::from_char_offset(text, 7),
            TextPosition { line: 3, column: 1 }
        );
        assert_eq!(TextPosition::from_char_offset(text, 7).to_string(), "3.1");
    }

    #[test]
    fn painter_last_write_wins_and_merges_runs() {
        let text = "abcdef";
        let mut painter = SpanPainter::new(text);
        painter.paint(0..4, Category::String);
        painter.paint(2..3, Category::Keyword);
        let spans = painter.finish();
        assert_eq!(
            spans,
            vec![
                Span::new(0..2, Category::String),
                Span::new(2..3, Category::Keyword),
                Span::new(3..4, Category::String),
            ]
        );
    }

    #[test]
    fn painter_reports_character_offsets() {
        let text = "é \"ü\"";
        let mut painter = SpanPainter::new(text);
        let start = text.find('"').unwrap();
        painter.paint(start..text.len(), Category::String);
        assert_eq!(painter.finish(), vec![Span::new(2..5, Category::String)]);
    }
}
