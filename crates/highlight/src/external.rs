//! syntect 為後盾的首選分詞器。 / Preferred tokenizer backed by syntect's bundled grammars.

use once_cell::sync::Lazy;
use syntect::easy::ScopeRegionIterator;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::language::LanguageId;
use crate::tokenizer::{Category, HighlightError, Span, SpanPainter, Tokenizer};

/// Scope selectors in precedence order. `keyword.operator` precedes the
/// generic `keyword` entry so operator words stay operators.
static SELECTORS: Lazy<Vec<(Scope, Category)>> = Lazy::new(|| {
    [
        ("comment", Category::Comment),
        ("keyword.operator", Category::Operator),
        ("keyword", Category::Keyword),
        ("storage.type", Category::Keyword),
        ("storage.modifier", Category::Keyword),
        ("support.function", Category::Builtin),
        ("support.class", Category::Builtin),
        ("support.type", Category::Builtin),
        ("entity.name.function", Category::Builtin),
        ("entity.name.class", Category::Builtin),
        ("entity.name.type", Category::Builtin),
        ("variable.function", Category::Builtin),
        ("string", Category::String),
        ("constant.numeric", Category::Number),
        ("punctuation", Category::Operator),
        ("entity.name.tag", Category::Tag),
        ("entity.other.attribute-name", Category::Attribute),
    ]
    .into_iter()
    .map(|(selector, category)| {
        let scope = Scope::new(selector).expect("built-in scope selector must parse");
        (scope, category)
    })
    .collect()
});

const PRECEDENCE: [Category; 8] = [
    Category::Comment,
    Category::Keyword,
    Category::Builtin,
    Category::String,
    Category::Number,
    Category::Operator,
    Category::Tag,
    Category::Attribute,
];

/// 使用 syntect 內建語法的分詞器。 / Tokenizer using syntect's default syntax definitions.
pub struct ExternalTokenizer {
    syntaxes: SyntaxSet,
}

impl ExternalTokenizer {
    /// 載入內建語法集合。 / Loads the bundled syntax set.
    pub fn load_defaults() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    fn syntax_for(&self, language: LanguageId) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_extension(lexer_extension(language))
            .or_else(|| self.syntaxes.find_syntax_by_extension("py"))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

impl Tokenizer for ExternalTokenizer {
    fn name(&self) -> &'static str {
        "syntect"
    }

    fn tokenize(&self, text: &str, language: LanguageId) -> Result<Vec<Span>, HighlightError> {
        let syntax = self.syntax_for(language);
        tracing::trace!(language = %language, syntax = %syntax.name, "external tokenize");

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut painter = SpanPainter::new(text);
        let mut consumed = 0usize;

        for line in LinesWithEndings::from(text) {
            let ops = state
                .parse_line(line, &self.syntaxes)
                .map_err(|err| HighlightError::External(err.to_string()))?;
            for (region, op) in ScopeRegionIterator::new(&ops, line) {
                stack
                    .apply(op)
                    .map_err(|err| HighlightError::External(format!("{err:?}")))?;
                if region.is_empty() {
                    continue;
                }
                if let Some(category) = classify(stack.as_slice()) {
                    painter.paint(consumed..consumed + region.len(), category);
                }
                consumed += region.len();
            }
        }

        if consumed != text.len() {
            return Err(HighlightError::LengthMismatch {
                consumed,
                expected: text.len(),
            });
        }
        Ok(painter.finish())
    }
}

fn lexer_extension(language: LanguageId) -> &'static str {
    language.extension().trim_start_matches('.')
}

/// 將 scope 堆疊依優先序對應至分類。 / Maps a scope stack onto the highest-precedence category.
fn classify(scopes: &[Scope]) -> Option<Category> {
    scopes
        .iter()
        .filter_map(|scope| {
            SELECTORS
                .iter()
                .find(|(selector, _)| selector.is_prefix_of(*scope))
                .map(|(_, category)| *category)
        })
        .min_by_key(|category| {
            PRECEDENCE
                .iter()
                .position(|candidate| candidate == category)
                .unwrap_or(PRECEDENCE.len())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(names: &[&str]) -> Vec<Scope> {
        names.iter().map(|name| Scope::new(name).unwrap()).collect()
    }

    #[test]
    fn classify_prefers_comment_over_punctuation() {
        let stack = scopes(&[
            "source.rust",
            "comment.line.double-slash.rust",
            "punctuation.definition.comment.rust",
        ]);
        assert_eq!(classify(&stack), Some(Category::Comment));
    }

    #[test]
    fn classify_operator_keyword_as_operator() {
        let stack = scopes(&["source.python", "keyword.operator.arithmetic.python"]);
        assert_eq!(classify(&stack), Some(Category::Operator));
    }

    #[test]
    fn classify_untagged_scope() {
        let stack = scopes(&["source.python", "meta.qualified-name.python"]);
        assert_eq!(classify(&stack), None);
    }

    #[test]
    fn tokenizes_rust_sample() {
        let tokenizer = ExternalTokenizer::load_defaults();
        let text = LanguageId::Rust.profile().sample;
        let spans = tokenizer.tokenize(text, LanguageId::Rust).unwrap();
        let total = text.chars().count();
        assert!(spans.iter().all(|span| span.range.end <= total));
        assert!(spans.iter().any(|span| span.category == Category::Comment));
        assert!(spans.iter().any(|span| span.category == Category::String));
    }

    #[test]
    fn unrecognized_grammar_uses_default_lexer() {
        let tokenizer = ExternalTokenizer::load_defaults();
        let spans = tokenizer
            .tokenize("# note\n{ x = 1; }\n", LanguageId::Nix)
            .unwrap();
        assert!(spans.iter().all(|span| span.range.end <= 18));
    }
}
