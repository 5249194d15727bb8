use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::{self, RuleSet};
use crate::HighlightError;

/// 編輯器支援的語言識別子。 / Identifier for one of the fixed set of supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    C,
    Cpp,
    Html,
    Css,
    JavaScript,
    TypeScript,
    Rust,
    Java,
    Lua,
    Go,
    CSharp,
    Ruby,
    Kotlin,
    Nix,
}

impl LanguageId {
    /// 依工具列順序列出所有語言。 / Every language in toolbar order.
    pub const ALL: [LanguageId; 15] = [
        LanguageId::Python,
        LanguageId::C,
        LanguageId::Cpp,
        LanguageId::Html,
        LanguageId::Css,
        LanguageId::JavaScript,
        LanguageId::TypeScript,
        LanguageId::Rust,
        LanguageId::Java,
        LanguageId::Lua,
        LanguageId::Go,
        LanguageId::CSharp,
        LanguageId::Ruby,
        LanguageId::Kotlin,
        LanguageId::Nix,
    ];

    /// 標準小寫識別子。 / Canonical lower-case identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageId::Python => "python",
            LanguageId::C => "c",
            LanguageId::Cpp => "cpp",
            LanguageId::Html => "html",
            LanguageId::Css => "css",
            LanguageId::JavaScript => "javascript",
            LanguageId::TypeScript => "typescript",
            LanguageId::Rust => "rust",
            LanguageId::Java => "java",
            LanguageId::Lua => "lua",
            LanguageId::Go => "go",
            LanguageId::CSharp => "csharp",
            LanguageId::Ruby => "ruby",
            LanguageId::Kotlin => "kotlin",
            LanguageId::Nix => "nix",
        }
    }

    /// 顯示於語言選單的名稱。 / Name shown in the language picker.
    pub fn display_name(self) -> &'static str {
        match self {
            LanguageId::Python => "Python",
            LanguageId::C => "C",
            LanguageId::Cpp => "C++",
            LanguageId::Html => "HTML",
            LanguageId::Css => "CSS",
            LanguageId::JavaScript => "JavaScript",
            LanguageId::TypeScript => "TypeScript",
            LanguageId::Rust => "Rust",
            LanguageId::Java => "Java",
            LanguageId::Lua => "Lua",
            LanguageId::Go => "Go",
            LanguageId::CSharp => "C#",
            LanguageId::Ruby => "Ruby",
            LanguageId::Kotlin => "Kotlin",
            LanguageId::Nix => "Nix",
        }
    }

    /// 以副檔名判斷開啟檔案時的語言；無法辨識時回傳 Python。 / Language chosen when opening a file by extension; unknown extensions map to Python.
    pub fn from_extension(extension: &str) -> Self {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "py" => LanguageId::Python,
            "c" => LanguageId::C,
            "cpp" | "cc" | "cxx" => LanguageId::Cpp,
            "html" | "htm" => LanguageId::Html,
            "css" => LanguageId::Css,
            "js" => LanguageId::JavaScript,
            "ts" => LanguageId::TypeScript,
            "rs" => LanguageId::Rust,
            "java" => LanguageId::Java,
            "lua" => LanguageId::Lua,
            "go" => LanguageId::Go,
            _ => LanguageId::Python,
        }
    }

    /// 標準副檔名（含前導點）。 / Canonical file extension, leading dot included.
    pub fn extension(self) -> &'static str {
        self.profile().extension
    }

    /// 是否為 Python 類語言（影響冒號縮排與註解符號）。 / Whether `:` opens a block and `#` comments lines.
    pub fn is_python_like(self) -> bool {
        matches!(self, LanguageId::Python)
    }

    /// 取得語言的靜態設定。 / Static metadata for this language.
    pub fn profile(self) -> LanguageProfile {
        LanguageProfile {
            id: self,
            extension: extension_for(self),
            sample: sample_for(self),
            comment_marker: if self.is_python_like() { "# " } else { "// " },
            rules: rules::rule_set(self),
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = HighlightError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let language = match normalized.as_str() {
            "python" | "py" => LanguageId::Python,
            "c" => LanguageId::C,
            "cpp" | "c++" => LanguageId::Cpp,
            "html" | "htm" => LanguageId::Html,
            "css" => LanguageId::Css,
            "javascript" | "js" => LanguageId::JavaScript,
            "typescript" | "ts" => LanguageId::TypeScript,
            "rust" | "rs" => LanguageId::Rust,
            "java" => LanguageId::Java,
            "lua" => LanguageId::Lua,
            "go" => LanguageId::Go,
            "csharp" | "cs" | "c#" => LanguageId::CSharp,
            "ruby" | "rb" => LanguageId::Ruby,
            "kotlin" | "kt" => LanguageId::Kotlin,
            "nix" => LanguageId::Nix,
            _ => return Err(HighlightError::UnknownLanguage(value.to_string())),
        };
        Ok(language)
    }
}

/// 每個語言的不可變設定：副檔名、範本、註解符號與後備規則。 / Immutable per-language record: extension, sample, comment marker and fallback rules.
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    pub id: LanguageId,
    pub extension: &'static str,
    pub sample: &'static str,
    pub comment_marker: &'static str,
    pub rules: &'static RuleSet,
}

fn extension_for(language: LanguageId) -> &'static str {
    match language {
        LanguageId::Python => ".py",
        LanguageId::C => ".c",
        LanguageId::Cpp => ".cpp",
        LanguageId::Html => ".html",
        LanguageId::Css => ".css",
        LanguageId::JavaScript => ".js",
        LanguageId::TypeScript => ".ts",
        LanguageId::Rust => ".rs",
        LanguageId::Java => ".java",
        LanguageId::Lua => ".lua",
        LanguageId::Go => ".go",
        LanguageId::CSharp => ".cs",
        LanguageId::Ruby => ".rb",
        LanguageId::Kotlin => ".kt",
        LanguageId::Nix => ".nix",
    }
}

fn sample_for(language: LanguageId) -> &'static str {
    match language {
        LanguageId::Python => {
            "# New Python file\n\nif __name__ == '__main__':\n    print('Hello from Vanilla Studio')\n"
        }
        LanguageId::C => {
            "/* New C file */\n#include <stdio.h>\n\nint main() {\n    printf(\"Hello, C from Vanilla Studio!\\n\");\n    return 0;\n}\n"
        }
        LanguageId::Cpp => {
            "// New C++ file\n#include <iostream>\nusing namespace std;\nint main(){\n    cout << \"Hello, C++ from Vanilla Studio!\" << endl;\n    return 0;\n}\n"
        }
        LanguageId::Html => {
            "<!doctype html>\n<html>\n  <head><meta charset=\"utf-8\"><title>Vanilla Studio</title></head>\n  <body>\n    <h1>Hello from Vanilla Studio</h1>\n  </body>\n</html>\n"
        }
        LanguageId::Css => {
            "/* New CSS */\nbody { font-family: sans-serif; background: #fff; color: #111; }\n"
        }
        LanguageId::JavaScript => "// New JavaScript\nconsole.log('Hello from Vanilla Studio');\n",
        LanguageId::TypeScript => "// New TypeScript\nconsole.log('Hello from Vanilla Studio');\n",
        LanguageId::Rust => {
            "// New Rust\nfn main() {\n    println!(\"Hello from Vanilla Studio\");\n}\n"
        }
        LanguageId::Java => {
            "// New Java\npublic class Main {\n    public static void main(String[] args) {\n        System.out.println(\"Hello from Vanilla Studio\");\n    }\n}\n"
        }
        LanguageId::Lua => "-- New Lua\nprint('Hello from Vanilla Studio')\n",
        LanguageId::Go => {
            "// New Go\npackage main\nimport \"fmt\"\nfunc main() {\n    fmt.Println(\"Hello from Vanilla Studio\")\n}\n"
        }
        LanguageId::CSharp => {
            "// New C#\nusing System;\nclass Program {\n    static void Main() {\n        Console.WriteLine(\"Hello from Vanilla Studio\");\n    }\n}\n"
        }
        LanguageId::Ruby => "# New Ruby\nputs 'Hello from Vanilla Studio'\n",
        LanguageId::Kotlin => {
            "// New Kotlin\nfun main() {\n    println(\"Hello from Vanilla Studio\")\n}\n"
        }
        LanguageId::Nix => {
            "# New Nix\n{ pkgs ? import <nixpkgs> {} }:\n\nwith pkgs;\n\nmkShell {\n  buildInputs = [\n    # Add your dependencies here\n  ];\n}\n"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table_matches_aliases() {
        let cases = [
            ("python", ".py"),
            ("c", ".c"),
            ("cpp", ".cpp"),
            ("html", ".html"),
            ("css", ".css"),
            ("javascript", ".js"),
            ("js", ".js"),
            ("typescript", ".ts"),
            ("ts", ".ts"),
            ("rust", ".rs"),
            ("java", ".java"),
            ("lua", ".lua"),
            ("go", ".go"),
            ("csharp", ".cs"),
            ("cs", ".cs"),
            ("ruby", ".rb"),
            ("rb", ".rb"),
            ("kotlin", ".kt"),
            ("kt", ".kt"),
            ("nix", ".nix"),
        ];
        for (tag, extension) in cases {
            let language: LanguageId = tag.parse().unwrap();
            assert_eq!(language.extension(), extension, "tag {tag}");
        }
    }

    #[test]
    fn open_by_extension_defaults_to_python() {
        assert_eq!(LanguageId::from_extension("cxx"), LanguageId::Cpp);
        assert_eq!(LanguageId::from_extension(".HTM"), LanguageId::Html);
        assert_eq!(LanguageId::from_extension("rs"), LanguageId::Rust);
        assert_eq!(LanguageId::from_extension("rb"), LanguageId::Python);
        assert_eq!(LanguageId::from_extension("nix"), LanguageId::Python);
        assert_eq!(LanguageId::from_extension(""), LanguageId::Python);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "cobol".parse::<LanguageId>().unwrap_err();
        assert!(matches!(err, HighlightError::UnknownLanguage(tag) if tag == "cobol"));
    }

    #[test]
    fn display_names_parse_back() {
        for language in LanguageId::ALL {
            assert_eq!(language.display_name().parse::<LanguageId>().unwrap(), language);
            assert_eq!(language.as_str().parse::<LanguageId>().unwrap(), language);
        }
    }

    #[test]
    fn comment_marker_depends_on_python() {
        assert_eq!(LanguageId::Python.profile().comment_marker, "# ");
        assert_eq!(LanguageId::Ruby.profile().comment_marker, "// ");
        assert_eq!(LanguageId::Rust.profile().comment_marker, "// ");
    }
}
