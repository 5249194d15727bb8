//! 各語言的執行配方與展開後的執行計畫。
//! Per-language run recipes and the plans resolved from them.
//!
//! A recipe is static data: the tools it needs up front, the message printed
//! when they are missing, and an ordered list of step templates. Templates
//! reference the source file through placeholders:
//!
//! | placeholder  | expands to                                   |
//! |--------------|----------------------------------------------|
//! | `{file}`     | the source file                              |
//! | `{artifact}` | the source file with its suffix set to `.out`|
//! | `{js}`       | the source file with its suffix set to `.js` |
//! | `{stem}`     | the file name without its suffix             |
//! | `{dir}`      | the file's parent directory                  |

use std::path::{Path, PathBuf};
use std::time::Duration;

use vanilla_highlight::LanguageId;

use crate::executor::RunSpec;

/// 步驟在鏈中的角色。 / What a process step is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRole {
    /// Prepares the directory; failure aborts the chain.
    Setup,
    /// Builds an artifact; output is shown only on failure, which aborts the chain.
    Compile,
    /// Runs the program; output is always shown.
    Execute,
}

impl StepRole {
    pub fn aborts_on_failure(self) -> bool {
        matches!(self, StepRole::Setup | StepRole::Compile)
    }
}

/// 步驟執行前要成立的條件。 / Guard evaluated right before a step would run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    ToolPresent(&'static str),
    ToolMissing(&'static str),
    /// No file with this extension exists in the working directory.
    NoFileWithExtension(&'static str),
    FileNamed(&'static str),
    FileNotNamed(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum ActionTemplate {
    Process {
        role: StepRole,
        program: &'static str,
        args: &'static [&'static str],
    },
    OpenBrowser {
        target: &'static str,
        note: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct StepTemplate {
    pub when: Condition,
    pub action: ActionTemplate,
}

/// 單一語言的靜態執行配方。 / Static run recipe for one language.
#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    pub language: LanguageId,
    /// Tools that must all be on `PATH` before anything runs.
    pub requires: &'static [&'static str],
    pub missing: &'static str,
    pub steps: &'static [StepTemplate],
}

const fn always(action: ActionTemplate) -> StepTemplate {
    StepTemplate {
        when: Condition::Always,
        action,
    }
}

const fn process(role: StepRole, program: &'static str, args: &'static [&'static str]) -> ActionTemplate {
    ActionTemplate::Process {
        role,
        program,
        args,
    }
}

const OPEN_IN_BROWSER: [StepTemplate; 1] = [always(ActionTemplate::OpenBrowser {
    target: "{file}",
    note: "Opened {file} in default browser.",
})];

static RECIPES: &[Recipe] = &[
    Recipe {
        language: LanguageId::Python,
        requires: &["python3"],
        missing: "Python interpreter (python3) not found in PATH.",
        steps: &[always(process(StepRole::Execute, "python3", &["{file}"]))],
    },
    Recipe {
        language: LanguageId::C,
        requires: &["gcc"],
        missing: "Compiler 'gcc' not found in PATH.",
        steps: &[
            always(process(StepRole::Compile, "gcc", &["{file}", "-o", "{artifact}"])),
            always(process(StepRole::Execute, "{artifact}", &[])),
        ],
    },
    Recipe {
        language: LanguageId::Cpp,
        requires: &["g++"],
        missing: "Compiler 'g++' not found in PATH.",
        steps: &[
            always(process(StepRole::Compile, "g++", &["{file}", "-o", "{artifact}"])),
            always(process(StepRole::Execute, "{artifact}", &[])),
        ],
    },
    Recipe {
        language: LanguageId::Rust,
        requires: &["rustc"],
        missing: "rustc not found in PATH.",
        steps: &[
            always(process(StepRole::Compile, "rustc", &["{file}", "-o", "{artifact}"])),
            always(process(StepRole::Execute, "{artifact}", &[])),
        ],
    },
    Recipe {
        language: LanguageId::Go,
        requires: &["go"],
        missing: "go not found in PATH.",
        steps: &[always(process(StepRole::Execute, "go", &["run", "{file}"]))],
    },
    Recipe {
        language: LanguageId::Java,
        requires: &["javac", "java"],
        missing: "javac/java not found in PATH.",
        steps: &[
            always(process(StepRole::Compile, "javac", &["{file}"])),
            always(process(StepRole::Execute, "java", &["{stem}"])),
        ],
    },
    Recipe {
        language: LanguageId::JavaScript,
        requires: &[],
        missing: "",
        steps: &[
            StepTemplate {
                when: Condition::ToolPresent("node"),
                action: process(StepRole::Execute, "node", &["{file}"]),
            },
            StepTemplate {
                when: Condition::ToolMissing("node"),
                action: ActionTemplate::OpenBrowser {
                    target: "{file}",
                    note: "Node not found; opened file in browser instead.",
                },
            },
        ],
    },
    Recipe {
        language: LanguageId::TypeScript,
        requires: &["tsc"],
        missing: "tsc (TypeScript compiler) not found in PATH.",
        steps: &[
            always(process(StepRole::Compile, "tsc", &["{file}", "--outFile", "{js}"])),
            StepTemplate {
                when: Condition::ToolPresent("node"),
                action: process(StepRole::Execute, "node", &["{js}"]),
            },
            StepTemplate {
                when: Condition::ToolMissing("node"),
                action: ActionTemplate::OpenBrowser {
                    target: "{js}",
                    note: "Node not found; opened compiled JS in browser.",
                },
            },
        ],
    },
    Recipe {
        language: LanguageId::Lua,
        requires: &["lua"],
        missing: "lua not found in PATH.",
        steps: &[always(process(StepRole::Execute, "lua", &["{file}"]))],
    },
    Recipe {
        language: LanguageId::Html,
        requires: &[],
        missing: "",
        steps: &OPEN_IN_BROWSER,
    },
    Recipe {
        language: LanguageId::Css,
        requires: &[],
        missing: "",
        steps: &OPEN_IN_BROWSER,
    },
    Recipe {
        language: LanguageId::CSharp,
        requires: &["dotnet"],
        missing: ".NET SDK not found in PATH.",
        steps: &[
            StepTemplate {
                when: Condition::NoFileWithExtension("csproj"),
                action: process(StepRole::Setup, "dotnet", &["new", "console", "-o", "."]),
            },
            always(process(StepRole::Execute, "dotnet", &["run"])),
        ],
    },
    Recipe {
        language: LanguageId::Ruby,
        requires: &["ruby"],
        missing: "Ruby not found in PATH.",
        steps: &[always(process(StepRole::Execute, "ruby", &["{file}"]))],
    },
    Recipe {
        language: LanguageId::Kotlin,
        requires: &["kotlinc"],
        missing: "Kotlin compiler not found in PATH.",
        steps: &[
            always(process(
                StepRole::Compile,
                "kotlinc",
                &["{file}", "-include-runtime", "-d", "out.jar"],
            )),
            always(process(StepRole::Execute, "java", &["-jar", "out.jar"])),
        ],
    },
    Recipe {
        language: LanguageId::Nix,
        requires: &["nix"],
        missing: "Nix not found in PATH.",
        steps: &[
            StepTemplate {
                when: Condition::FileNamed("flake.nix"),
                action: process(StepRole::Execute, "nix", &["develop", "."]),
            },
            StepTemplate {
                when: Condition::FileNotNamed("flake.nix"),
                action: process(StepRole::Execute, "nix-shell", &["{file}"]),
            },
        ],
    },
];

/// 查詢語言的執行配方。 / Looks up the recipe for a language.
pub fn recipe_for(language: LanguageId) -> Option<&'static Recipe> {
    RECIPES.iter().find(|recipe| recipe.language == language)
}

/// 展開後的動作。 / A step action with its placeholders expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Process {
        role: StepRole,
        spec: RunSpec,
        /// Whether the program is a bare tool name to look up on `PATH`.
        probe: bool,
    },
    OpenBrowser {
        target: PathBuf,
        note: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub when: Condition,
    pub action: PlannedAction,
}

/// 單次執行的計畫；每次執行都重新查詢。 / Plan for one run, resolved fresh on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub language: LanguageId,
    pub file: PathBuf,
    pub working_dir: PathBuf,
    pub requires: Vec<&'static str>,
    pub missing: &'static str,
    pub steps: Vec<PlannedStep>,
}

impl RunPlan {
    /// 依配方展開佔位符；相對路徑先轉為絕對路徑。 / Expands a language's recipe for `file`, made absolute first.
    pub fn resolve(file: &Path, language: LanguageId, timeout: Duration) -> Option<Self> {
        let recipe = recipe_for(language)?;
        let file = absolute_file(file);
        let file = file.as_path();
        let working_dir = file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let vars = Placeholders::new(file, &working_dir);

        let steps = recipe
            .steps
            .iter()
            .map(|template| PlannedStep {
                when: template.when,
                action: match template.action {
                    ActionTemplate::Process {
                        role,
                        program,
                        args,
                    } => PlannedAction::Process {
                        role,
                        spec: RunSpec::new(vars.expand(program))
                            .with_args(args.iter().map(|arg| vars.expand(arg)))
                            .with_working_dir(working_dir.clone())
                            .with_timeout(timeout),
                        probe: !program.contains('{'),
                    },
                    ActionTemplate::OpenBrowser { target, note } => PlannedAction::OpenBrowser {
                        target: PathBuf::from(vars.expand(target)),
                        note: vars.expand(note),
                    },
                },
            })
            .collect();

        tracing::debug!(language = %language, file = %file.display(), "run plan resolved");
        Some(Self {
            language,
            file: file.to_path_buf(),
            working_dir,
            requires: recipe.requires.to_vec(),
            missing: recipe.missing,
            steps,
        })
    }
}

/// 步驟的工作目錄是檔案所在目錄，所以 `{file}` 與產物路徑必須是絕對路徑。 / Steps run in the file's directory, so `{file}` and derived artifacts must not stay relative.
fn absolute_file(file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    std::path::absolute(file).unwrap_or_else(|err| {
        tracing::debug!(file = %file.display(), error = %err, "could not make path absolute");
        file.to_path_buf()
    })
}

struct Placeholders {
    file: String,
    artifact: String,
    js: String,
    stem: String,
    dir: String,
}

impl Placeholders {
    fn new(file: &Path, dir: &Path) -> Self {
        Self {
            file: file.display().to_string(),
            artifact: file.with_extension("out").display().to_string(),
            js: file.with_extension("js").display().to_string(),
            stem: file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            dir: dir.display().to_string(),
        }
    }

    fn expand(&self, template: &str) -> String {
        template
            .replace("{file}", &self.file)
            .replace("{artifact}", &self.artifact)
            .replace("{js}", &self.js)
            .replace("{stem}", &self.stem)
            .replace("{dir}", &self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn process_lines(plan: &RunPlan) -> Vec<String> {
        plan.steps
            .iter()
            .filter_map(|step| match &step.action {
                PlannedAction::Process { spec, .. } => Some(spec.display_line()),
                PlannedAction::OpenBrowser { .. } => None,
            })
            .collect()
    }

    #[test]
    fn every_language_has_a_recipe() {
        for language in LanguageId::ALL {
            assert!(recipe_for(language).is_some(), "{language}");
        }
    }

    #[test]
    fn c_compiles_then_runs_artifact() {
        let plan = RunPlan::resolve(Path::new("/work/hello.c"), LanguageId::C, TIMEOUT).unwrap();
        assert_eq!(plan.working_dir, PathBuf::from("/work"));
        assert_eq!(
            process_lines(&plan),
            vec!["gcc /work/hello.c -o /work/hello.out", "/work/hello.out"]
        );
        match &plan.steps[1].action {
            PlannedAction::Process { probe, spec, .. } => {
                assert!(!probe);
                assert_eq!(spec.timeout_ms, Some(60_000));
                assert_eq!(spec.working_dir.as_deref(), Some(Path::new("/work")));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn java_runs_class_named_after_stem() {
        let plan = RunPlan::resolve(Path::new("/src/Main.java"), LanguageId::Java, TIMEOUT).unwrap();
        assert_eq!(plan.requires, vec!["javac", "java"]);
        assert_eq!(process_lines(&plan), vec!["javac /src/Main.java", "java Main"]);
    }

    #[test]
    fn typescript_compiles_to_sibling_js() {
        let plan = RunPlan::resolve(Path::new("/a/app.ts"), LanguageId::TypeScript, TIMEOUT).unwrap();
        assert_eq!(
            process_lines(&plan),
            vec!["tsc /a/app.ts --outFile /a/app.js", "node /a/app.js"]
        );
        assert!(matches!(
            &plan.steps[2].action,
            PlannedAction::OpenBrowser { target, .. } if target == Path::new("/a/app.js")
        ));
    }

    #[test]
    fn html_only_opens_browser() {
        let plan = RunPlan::resolve(Path::new("/site/index.html"), LanguageId::Html, TIMEOUT).unwrap();
        assert!(plan.requires.is_empty());
        assert_eq!(
            plan.steps[0].action,
            PlannedAction::OpenBrowser {
                target: PathBuf::from("/site/index.html"),
                note: "Opened /site/index.html in default browser.".to_string(),
            }
        );
    }

    #[test]
    fn bare_file_name_resolves_against_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let plan = RunPlan::resolve(Path::new("script.rb"), LanguageId::Ruby, TIMEOUT).unwrap();
        assert_eq!(plan.file, cwd.join("script.rb"));
        assert_eq!(plan.working_dir, cwd);
        assert_eq!(plan.missing, "Ruby not found in PATH.");
    }

    #[test]
    fn relative_paths_expand_to_absolute_arguments() {
        let cwd = std::env::current_dir().unwrap();
        let plan = RunPlan::resolve(Path::new("src/hello.c"), LanguageId::C, TIMEOUT).unwrap();
        let source = cwd.join("src/hello.c");
        let artifact = cwd.join("src/hello.out");
        assert_eq!(plan.working_dir, cwd.join("src"));
        assert_eq!(
            process_lines(&plan),
            vec![
                format!("gcc {} -o {}", source.display(), artifact.display()),
                artifact.display().to_string(),
            ]
        );

        let plan = RunPlan::resolve(Path::new("top.ts"), LanguageId::TypeScript, TIMEOUT).unwrap();
        assert!(matches!(
            &plan.steps[2].action,
            PlannedAction::OpenBrowser { target, .. } if *target == cwd.join("top.js")
        ));
    }
}
