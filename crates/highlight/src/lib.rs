//! Syntax highlighting for Vanilla Studio documents.
//! （Vanilla Studio 文件的語法標記。）
//!
//! Two interchangeable strategies sit behind the [`Tokenizer`] trait: the
//! syntect-backed [`ExternalTokenizer`] (compiled in with the
//! `external-lexer` feature) and the always-available [`RegexTokenizer`].
//! [`Highlighter`] prefers the former and silently falls back to the latter.

#[cfg(feature = "external-lexer")]
mod external;
mod language;
mod rules;
mod theme;
mod tokenizer;

use serde::{Deserialize, Serialize};

#[cfg(feature = "external-lexer")]
pub use external::ExternalTokenizer;
pub use language::{LanguageId, LanguageProfile};
pub use rules::{rule_set, RegexTokenizer, Rule, RuleSet};
pub use theme::{
    parse_highlight_palette, Color, ColorParseError, HighlightPalette, ThemeParseError,
};
pub use tokenizer::{Category, HighlightError, Span, TextPosition, Tokenizer};

/// 選擇首選分詞器的策略。 / How the preferred tokenizer is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// 可用時使用外部分詞器。 / External lexer when compiled in, regex otherwise.
    #[default]
    Auto,
    /// 要求外部分詞器；不可用時仍回退。 / Ask for the external lexer; still falls back.
    External,
    /// 只使用正規表示式規則。 / Regex rules only.
    Regex,
}

/// 單次標記的結果與實際使用的分詞器。 / Spans from one pass plus the tokenizer that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOutcome {
    pub spans: Vec<Span>,
    pub tokenizer: &'static str,
    pub fell_back: bool,
}

/// 先嘗試首選分詞器，失敗時改用正規表示式。 / Tries the preferred tokenizer, falling back to regex rules on any error.
pub struct Highlighter {
    preferred: Option<Box<dyn Tokenizer>>,
    fallback: RegexTokenizer,
}

impl Highlighter {
    /// 依策略建立；外部分詞器只在啟動時載入一次。 / Builds for a strategy; the external lexer is loaded once here.
    pub fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Regex => Self::regex_only(),
            Strategy::Auto | Strategy::External => Self {
                preferred: external_tokenizer(),
                fallback: RegexTokenizer,
            },
        }
    }

    pub fn regex_only() -> Self {
        Self {
            preferred: None,
            fallback: RegexTokenizer,
        }
    }

    /// 以自訂首選分詞器建立（測試或替代實作）。 / Uses a caller-provided preferred tokenizer.
    pub fn with_preferred(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            preferred: Some(tokenizer),
            fallback: RegexTokenizer,
        }
    }

    /// 是否具備首選分詞器。 / Whether a preferred tokenizer is available.
    pub fn has_preferred(&self) -> bool {
        self.preferred.is_some()
    }

    /// 產生完整取代前次結果的標記區間。 / Produces spans that fully replace any previous pass.
    pub fn highlight(&self, text: &str, language: LanguageId) -> HighlightOutcome {
        if let Some(preferred) = &self.preferred {
            match preferred.tokenize(text, language) {
                Ok(spans) => {
                    return HighlightOutcome {
                        spans,
                        tokenizer: preferred.name(),
                        fell_back: false,
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        tokenizer = preferred.name(),
                        language = %language,
                        error = %err,
                        "preferred tokenizer failed; using regex rules"
                    );
                }
            }
        }
        HighlightOutcome {
            spans: self.fallback.spans(text, language),
            tokenizer: self.fallback.name(),
            fell_back: self.preferred.is_some(),
        }
    }

    /// 只回傳標記區間。 / Convenience wrapper returning only the spans.
    pub fn spans(&self, text: &str, language: LanguageId) -> Vec<Span> {
        self.highlight(text, language).spans
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(Strategy::Auto)
    }
}

#[cfg(feature = "external-lexer")]
fn external_tokenizer() -> Option<Box<dyn Tokenizer>> {
    Some(Box::new(ExternalTokenizer::load_defaults()))
}

#[cfg(not(feature = "external-lexer"))]
fn external_tokenizer() -> Option<Box<dyn Tokenizer>> {
    None
}
