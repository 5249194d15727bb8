use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::Level;
use vanilla_core::{enforce_extension, Document};
use vanilla_highlight::{Highlighter, LanguageId, Strategy, TextPosition};
use vanilla_project::WorkspaceTree;
use vanilla_runexec::{OutputSink, RunDispatcher};
use vanilla_settings::{Preferences, PreferencesStore};
use vanilla_studio_cli::StudioApp;

#[derive(Parser)]
#[command(
    name = "vanilla-studio",
    about = "Editing, highlighting and run helpers for Vanilla Studio",
    author,
    version
)]
struct Cli {
    /// 偏好設定檔路徑。 / Preferences file (JSON); defaults are used when it is missing.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 增加紀錄詳細程度（可重複）。 / Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出支援的語言。 / List supported languages.
    Languages,
    /// 以語言範本建立新檔。 / Write a language's sample template to a new file.
    New(NewArgs),
    /// 輸出語法標記區間。 / Print highlight spans for a file.
    Highlight(HighlightArgs),
    /// 以對應工具鏈執行檔案。 / Run a file with its language toolchain.
    Run(RunArgs),
    /// 顯示工作區樹狀結構。 / Print a workspace tree.
    Tree(TreeArgs),
    /// 尋找第一個符合處。 / Find the first occurrence of text in a file.
    Find(FindArgs),
}

#[derive(Args)]
struct NewArgs {
    /// 語言代號或別名（如 py、c++、rb）。 / Language id or alias (e.g. py, c++, rb).
    language: LanguageId,
    /// 檔名；副檔名會依語言修正。 / File name; the extension is corrected for the language.
    #[arg(long, default_value = "untitled")]
    name: String,
    /// 輸出目錄。 / Output directory.
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,
}

#[derive(Args)]
struct HighlightArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// 覆寫副檔名推定的語言。 / Override the language derived from the extension.
    #[arg(long)]
    language: Option<LanguageId>,
    /// 分詞策略；預設取自偏好設定。 / Tokenizer strategy; defaults to the preferences value.
    #[arg(long)]
    strategy: Option<StrategyChoice>,
    /// 以 JSON 輸出。 / Emit JSON instead of text.
    #[arg(long, conflicts_with = "color")]
    json: bool,
    /// 以 ANSI 色彩輸出原文。 / Print the source coloured with ANSI escapes.
    #[arg(long)]
    color: bool,
}

#[derive(Args)]
struct RunArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// 語言標籤；未知標籤只會輸出訊息。 / Language tag; unknown tags are reported on the console.
    #[arg(long)]
    language: Option<String>,
    /// 每個步驟的逾時秒數。 / Per-step timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Args)]
struct TreeArgs {
    #[arg(value_name = "ROOT")]
    root: PathBuf,
    /// 列出的目錄層數。 / Directory levels listed below the root.
    #[arg(long)]
    depth: Option<usize>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FindArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,
    needle: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyChoice {
    Auto,
    External,
    Regex,
}

impl From<StrategyChoice> for Strategy {
    fn from(choice: StrategyChoice) -> Self {
        match choice {
            StrategyChoice::Auto => Strategy::Auto,
            StrategyChoice::External => Strategy::External,
            StrategyChoice::Regex => Strategy::Regex,
        }
    }
}

/// 把主控台輸出直接寫到標準輸出。 / Console sink that echoes to stdout as text arrives.
struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::debug!(error = %err, "console write to stdout failed");
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        config,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);
    let preferences = load_preferences(config.as_deref())?;
    match command {
        Commands::Languages => execute_languages(),
        Commands::New(args) => execute_new(args),
        Commands::Highlight(args) => execute_highlight(args, &preferences),
        Commands::Run(args) => execute_run(args, preferences),
        Commands::Tree(args) => execute_tree(args, &preferences),
        Commands::Find(args) => execute_find(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn load_preferences(path: Option<&Path>) -> Result<Preferences> {
    match path {
        Some(path) => {
            let store = PreferencesStore::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            Ok(store.preferences().clone())
        }
        None => Ok(Preferences::default()),
    }
}

fn execute_languages() -> Result<()> {
    for language in LanguageId::ALL {
        let profile = language.profile();
        println!(
            "{:<12} {:<6} {}",
            language.as_str(),
            profile.extension,
            profile.comment_marker.trim_end()
        );
    }
    Ok(())
}

fn execute_new(args: NewArgs) -> Result<()> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let target = enforce_extension(&dir.join(&args.name), args.language);
    if target.exists() {
        bail!("'{}' already exists", target.display());
    }
    let mut document = Document::untitled(args.language);
    let saved = document.save_as(&target)?;
    println!("Created {} ({})", saved.display(), args.language.display_name());
    Ok(())
}

fn open_document(path: &Path, language: Option<LanguageId>) -> Result<(String, LanguageId)> {
    let document = match language {
        Some(language) => Document::open_as(path, language)?,
        None => Document::open(path)?,
    };
    Ok((document.contents().to_string(), document.language()))
}

fn execute_highlight(args: HighlightArgs, preferences: &Preferences) -> Result<()> {
    let (text, language) = open_document(&args.input, args.language)?;
    let strategy = args
        .strategy
        .map(Strategy::from)
        .unwrap_or(preferences.highlight.strategy);
    let highlighter = Highlighter::new(strategy);
    let outcome = highlighter.highlight(&text, language);
    tracing::info!(tokenizer = outcome.tokenizer, spans = outcome.spans.len(), "highlighted");

    if args.json {
        let spans: Vec<_> = outcome
            .spans
            .iter()
            .map(|span| {
                let start = span.start_position(&text);
                json!({
                    "start": span.range.start,
                    "end": span.range.end,
                    "category": span.category,
                    "line": start.line,
                    "column": start.column,
                })
            })
            .collect();
        let payload = json!({
            "language": language,
            "tokenizer": outcome.tokenizer,
            "fell_back": outcome.fell_back,
            "spans": spans,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if args.color {
        let palette = preferences
            .highlight
            .palette()
            .context("invalid highlight palette in config")?;
        print!("{}", palette.render_ansi(&text, &outcome.spans));
    } else {
        for span in &outcome.spans {
            let start = span.start_position(&text);
            println!(
                "{}..{} {} {}:{}",
                span.range.start, span.range.end, span.category, start.line, start.column
            );
        }
    }
    Ok(())
}

fn execute_run(args: RunArgs, mut preferences: Preferences) -> Result<()> {
    if let Some(timeout) = args.timeout {
        preferences.run.timeout_secs = timeout.max(1);
    }
    let timeout = Duration::from_secs(preferences.run.timeout_secs);
    let mut app = StudioApp::new(preferences, Arc::new(StdoutSink))
        .with_dispatcher(RunDispatcher::new(timeout));
    app.open_file(&args.input)?;
    app.run_current_as(args.language.as_deref())?;
    if let Some(report) = app.wait_for_run() {
        tracing::info!(outcome = ?report.outcome, spawned = report.spawned, "run complete");
    }
    Ok(())
}

fn execute_tree(args: TreeArgs, preferences: &Preferences) -> Result<()> {
    let depth = args.depth.unwrap_or(preferences.workspace.tree_depth);
    let tree = WorkspaceTree::scan(&args.root, depth)
        .with_context(|| format!("failed to open workspace {}", args.root.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        println!("Workspace: {}", tree.name());
        for line in tree.render() {
            println!("{line}");
        }
    }
    Ok(())
}

fn execute_find(args: FindArgs) -> Result<()> {
    let mut document = Document::open(&args.input)?;
    match document.find(&args.needle) {
        Some(range) => {
            let TextPosition { line, column } = document.position_of(range.start);
            println!("{line}:{column}");
        }
        None => println!("Not found."),
    }
    Ok(())
}
