//! 後備的正規表示式標記規則。 / Regex rule tables used when no external lexer is available.
//!
//! Each rule is applied independently over the whole text; matches of one rule
//! never overlap each other, but a later rule may re-tag characters an earlier
//! rule already tagged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::LanguageId;
use crate::tokenizer::{Category, HighlightError, Span, SpanPainter, Tokenizer};

const PYTHON_KEYWORDS: &str = r"\b(?:def|class|if|else|elif|for|while|try|except|finally|with|as|import|from|return|in|is|and|or|not|lambda|pass|break|continue|yield|global|nonlocal|assert|del)\b";

const C_FAMILY_KEYWORDS: &str = r"\b(?:int|char|float|double|void|if|else|for|while|do|switch|case|break|continue|return|struct|typedef|enum|const|static|extern|sizeof|class|public|private|protected|using|namespace|package|import|func|let|var|impl|trait|fn|match|mod|println|println!|string|bool|interface|virtual|override|sealed|abstract|readonly|async|await|fun|val|suspend|companion|object|init|constructor|internal|open|final|data|get|set)\b";

const RUBY_KEYWORDS: &str = r"\b(?:def|class|if|else|elsif|end|unless|case|when|while|until|for|in|do|module|begin|rescue|ensure|yield|return|super|self|nil|true|false|and|or|not|alias|undef|BEGIN|END)\b";

const NIX_KEYWORDS: &str = r"\b(?:let|in|rec|with|inherit|or|import|importall|builtins|null|true|false|mkDerivation|mkShell|fetchFromGitHub|stdenv|lib|pkgs)\b";

const SCRIPT_KEYWORDS: &str = r"\b(?:function|var|let|const|if|else|for|while|return|new|this|class|extends|constructor|import|from|export|await|async|console|print)\b";

const HASH_LINE_COMMENT: &str = r"#.*";
const SLASH_LINE_COMMENT: &str = r"//.*";
const BLOCK_COMMENT: &str = r"(?s)/\*.*?\*/";
const QUOTED_STRING: &str = r#"(?s)".*?"|'.*?'"#;

/// 一條規則：樣式、分類與要標記的擷取群組。 / A single (pattern, category) pair.
#[derive(Debug)]
pub struct Rule {
    pub category: Category,
    regex: Regex,
    group: usize,
}

impl Rule {
    fn new(category: Category, pattern: &str) -> Self {
        Self::with_group(category, pattern, 0)
    }

    fn with_group(category: Category, pattern: &str, group: usize) -> Self {
        let regex = Regex::new(pattern).expect("built-in highlight rule must compile");
        Self {
            category,
            regex,
            group,
        }
    }

    fn apply(&self, text: &str, painter: &mut SpanPainter<'_>) {
        if self.group == 0 {
            for found in self.regex.find_iter(text) {
                painter.paint(found.range(), self.category);
            }
            return;
        }
        for captures in self.regex.captures_iter(text) {
            if let Some(found) = captures.get(self.group) {
                painter.paint(found.range(), self.category);
            }
        }
    }
}

/// 依序套用的規則清單。 / Ordered rule list for one language family.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

static PYTHON: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Comment, HASH_LINE_COMMENT),
        Rule::new(
            Category::String,
            r#"(?s)("""(?:.*?)"""|'''.*?'''|".*?"|'.*?')"#,
        ),
        Rule::new(Category::Keyword, PYTHON_KEYWORDS),
    ],
});

static C_FAMILY: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Comment, SLASH_LINE_COMMENT),
        Rule::new(Category::Comment, BLOCK_COMMENT),
        Rule::new(Category::String, QUOTED_STRING),
        Rule::new(Category::Keyword, C_FAMILY_KEYWORDS),
    ],
});

static RUBY: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Comment, HASH_LINE_COMMENT),
        Rule::new(
            Category::String,
            r#"(?s)("""(?:.*?)"""|'''.*?'''|".*?"|'.*?'|%[qQ]?\{.*?\}|%[qQ]?\[.*?\])"#,
        ),
        Rule::new(Category::Keyword, RUBY_KEYWORDS),
    ],
});

static NIX: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Comment, HASH_LINE_COMMENT),
        Rule::new(Category::String, r#"(?s)".*?"|''.*?''"#),
        Rule::new(Category::Keyword, NIX_KEYWORDS),
    ],
});

static HTML: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Tag, r"<[^>]+>"),
        // no look-ahead in `regex`; consume the `=` and tag only the name
        Rule::with_group(Category::Attribute, r"(\w+)=", 1),
        Rule::new(Category::String, QUOTED_STRING),
    ],
});

static CSS: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Comment, BLOCK_COMMENT),
        Rule::new(Category::String, QUOTED_STRING),
    ],
});

static SCRIPT: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    rules: vec![
        Rule::new(Category::Comment, SLASH_LINE_COMMENT),
        Rule::new(Category::Comment, BLOCK_COMMENT),
        Rule::new(Category::String, r#"(?s)".*?"|'.*?'|`.*?`"#),
        Rule::new(Category::Keyword, SCRIPT_KEYWORDS),
    ],
});

/// 取得語言所屬家族的規則。 / Rule set of the family a language belongs to.
pub fn rule_set(language: LanguageId) -> &'static RuleSet {
    match language {
        LanguageId::Python => &PYTHON,
        LanguageId::C
        | LanguageId::Cpp
        | LanguageId::Rust
        | LanguageId::Java
        | LanguageId::Go
        | LanguageId::CSharp
        | LanguageId::Kotlin => &C_FAMILY,
        LanguageId::Ruby => &RUBY,
        LanguageId::Nix => &NIX,
        LanguageId::Html => &HTML,
        LanguageId::Css => &CSS,
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Lua => &SCRIPT,
    }
}

/// 永遠可用、結果可重現的正規表示式分詞器。 / Deterministic regex tokenizer, always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexTokenizer;

impl RegexTokenizer {
    /// 不會失敗的標記流程。 / Infallible highlighting pass.
    pub fn spans(&self, text: &str, language: LanguageId) -> Vec<Span> {
        let mut painter = SpanPainter::new(text);
        for rule in rule_set(language).rules() {
            rule.apply(text, &mut painter);
        }
        painter.finish()
    }
}

impl Tokenizer for RegexTokenizer {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn tokenize(&self, text: &str, language: LanguageId) -> Result<Vec<Span>, HighlightError> {
        Ok(self.spans(text, language))
    }
}
