use std::collections::HashMap;

use crate::tokenizer::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 轉為 24 位元 ANSI 前景色碼。 / 24-bit ANSI foreground escape.
    pub fn ansi_foreground(self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.r, self.g, self.b)
    }
}

/// 各分類使用的前景色。 / Foreground colour per highlight category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightPalette {
    colors: HashMap<Category, Color>,
}

impl Default for HighlightPalette {
    fn default() -> Self {
        let colors = [
            (Category::Keyword, Color::rgb(0xff, 0xb8, 0x6c)),
            (Category::Builtin, Color::rgb(0x8b, 0xe9, 0xfd)),
            (Category::Comment, Color::rgb(0x62, 0x72, 0xa4)),
            (Category::String, Color::rgb(0xf1, 0xfa, 0x8c)),
            (Category::Number, Color::rgb(0xbd, 0x93, 0xf9)),
            (Category::Operator, Color::rgb(0xff, 0x79, 0xc6)),
            (Category::Tag, Color::rgb(0xff, 0xb8, 0x6c)),
            (Category::Attribute, Color::rgb(0x8b, 0xe9, 0xfd)),
        ]
        .into_iter()
        .collect();
        Self { colors }
    }
}

impl HighlightPalette {
    pub fn color_for(&self, category: Category) -> Option<Color> {
        self.colors.get(&category).copied()
    }

    pub fn insert(&mut self, category: Category, color: Color) {
        self.colors.insert(category, color);
    }

    /// 以 ANSI 色碼渲染標記後的文字。 / Renders `text` with ANSI colours for each span.
    pub fn render_ansi(&self, text: &str, spans: &[crate::Span]) -> String {
        let mut output = String::with_capacity(text.len() + spans.len() * 24);
        let mut spans = spans.iter().peekable();
        let mut open = false;
        for (index, ch) in text.chars().enumerate() {
            if open && spans.peek().map_or(true, |span| index >= span.range.end) {
                output.push_str("\x1b[0m");
                open = false;
                spans.next();
            }
            while spans.peek().map_or(false, |span| span.range.end <= index) {
                spans.next();
            }
            if !open {
                if let Some(span) = spans.peek() {
                    if span.range.start == index {
                        if let Some(color) = self.color_for(span.category) {
                            output.push_str(&color.ansi_foreground());
                            open = true;
                        }
                    }
                }
            }
            output.push(ch);
        }
        if open {
            output.push_str("\x1b[0m");
        }
        output
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeParseError {
    #[error("palette must be a JSON object")]
    InvalidPalette,
    #[error("unknown highlight category '{0}'")]
    UnknownCategory(String),
    #[error("invalid color '{value}': {reason}")]
    InvalidColor {
        value: String,
        reason: ColorParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorParseError {
    MissingHash,
    InvalidLength,
    InvalidHex,
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorParseError::MissingHash => write!(f, "missing leading '#'"),
            ColorParseError::InvalidLength => write!(f, "expected 6 hex digits"),
            ColorParseError::InvalidHex => write!(f, "contains non-hex digits"),
        }
    }
}

/// 以 `{"keyword": "#rrggbb", ...}` 覆寫預設配色。 / Overrides the default palette from a JSON object.
pub fn parse_highlight_palette(
    value: &serde_json::Value,
) -> Result<HighlightPalette, ThemeParseError> {
    let map = value.as_object().ok_or(ThemeParseError::InvalidPalette)?;
    let mut palette = HighlightPalette::default();
    for (name, entry) in map {
        let category = Category::ALL
            .into_iter()
            .find(|category| category.as_str() == name)
            .ok_or_else(|| ThemeParseError::UnknownCategory(name.clone()))?;
        let raw = entry.as_str().ok_or(ThemeParseError::InvalidPalette)?;
        let color = parse_color(raw).map_err(|reason| ThemeParseError::InvalidColor {
            value: raw.to_string(),
            reason,
        })?;
        palette.insert(category, color);
    }
    Ok(palette)
}

fn parse_color(input: &str) -> Result<Color, ColorParseError> {
    let hex = input
        .trim()
        .strip_prefix('#')
        .ok_or(ColorParseError::MissingHash)?;
    if hex.len() != 6 {
        return Err(ColorParseError::InvalidLength);
    }
    let mut components = [0u8; 3];
    for (index, component) in components.iter_mut().enumerate() {
        let slice = hex
            .get(index * 2..index * 2 + 2)
            .ok_or(ColorParseError::InvalidHex)?;
        *component = u8::from_str_radix(slice, 16).map_err(|_| ColorParseError::InvalidHex)?;
    }
    Ok(Color::rgb(components[0], components[1], components[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;
    use serde_json::json;

    #[test]
    fn parses_palette_overrides() {
        let value = json!({
            "keyword": "#FFAA00",
            "string": "#11aaff"
        });
        let palette = parse_highlight_palette(&value).unwrap();
        assert_eq!(
            palette.color_for(Category::Keyword),
            Some(Color::rgb(0xff, 0xaa, 0x00))
        );
        assert_eq!(
            palette.color_for(Category::Comment),
            Some(Color::rgb(0x62, 0x72, 0xa4))
        );
    }

    #[test]
    fn rejects_unknown_category_and_bad_colors() {
        let err = parse_highlight_palette(&json!({"identifier": "#000000"})).unwrap_err();
        assert!(matches!(err, ThemeParseError::UnknownCategory(_)));
        let err = parse_highlight_palette(&json!({"keyword": "fff"})).unwrap_err();
        assert!(matches!(
            err,
            ThemeParseError::InvalidColor {
                reason: ColorParseError::MissingHash,
                ..
            }
        ));
    }

    #[test]
    fn renders_ansi_around_spans() {
        let mut palette = HighlightPalette::default();
        palette.insert(Category::Keyword, Color::rgb(1, 2, 3));
        let rendered = palette.render_ansi("fn x", &[Span::new(0..2, Category::Keyword)]);
        assert_eq!(rendered, "\x1b[38;2;1;2;3mfn\x1b[0m x");
    }
}
