use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use vanilla_highlight::LanguageId;

use crate::executor::{RunExecutor, RunResult, RunSpec};
use crate::plan::{Condition, PlannedAction, RunPlan, StepRole};
use crate::probe::{PathProbe, ToolProbe};

/// 預設每個步驟的逾時。 / Default per-step wall-clock timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// 執行外部程序。 / Runs one external process to completion.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, spec: &RunSpec) -> RunResult;
}

/// 以 [`RunExecutor`] 實際執行。 / Spawns real processes through [`RunExecutor`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &RunSpec) -> RunResult {
        RunExecutor::execute(spec)
    }
}

/// 以預設瀏覽器開啟本機檔案。 / Opens a local file in the default browser.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, target: &Path) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, target: &Path) -> std::io::Result<()> {
        let absolute = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
        open::that(&absolute)
    }
}

/// 只能附加的輸出目的地。 / Append-only text sink shared with the run worker.
pub trait OutputSink: Send + Sync {
    fn append(&self, text: &str);
}

/// 記憶體中的主控台。 / In-memory console buffer.
#[derive(Debug, Default)]
pub struct Console {
    text: Mutex<String>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text
            .lock()
            .map(|text| text.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn clear(&self) {
        match self.text.lock() {
            Ok(mut text) => text.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl OutputSink for Console {
    fn append(&self, text: &str) {
        match self.text.lock() {
            Ok(mut buffer) => buffer.push_str(text),
            Err(poisoned) => poisoned.into_inner().push_str(text),
        }
    }
}

/// 協作式停止旗標；不會終止已啟動的程序。 / Cooperative stop flag; never kills a process already started.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 一次執行的結束方式。 / How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    UnknownLanguage(String),
    MissingTool(String),
    /// A setup or compile step exited non-zero; later steps were skipped.
    StepFailed { program: String, exit_code: i32 },
    Stopped,
    Failed(String),
}

/// 執行摘要。 / Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub spawned: usize,
}

/// 依語言配方依序執行步驟。 / Executes a language's run plan step by step.
pub struct RunDispatcher {
    runner: Arc<dyn ProcessRunner>,
    probe: Arc<dyn ToolProbe>,
    browser: Arc<dyn BrowserLauncher>,
    timeout: Duration,
}

impl Default for RunDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl RunDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            probe: Arc::new(PathProbe::from_env()),
            browser: Arc::new(SystemBrowser),
            timeout,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ToolProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 以語言標籤字串執行；未知語言只輸出訊息。 / Runs by language tag; unknown tags only print a message.
    pub fn run_tag(&self, file: &Path, tag: &str, sink: &dyn OutputSink, stop: &StopFlag) -> RunReport {
        match tag.parse::<LanguageId>() {
            Ok(language) => self.run(file, language, sink, stop),
            Err(_) => {
                sink.append("Unknown language: cannot run.\n");
                RunReport {
                    outcome: RunOutcome::UnknownLanguage(tag.to_string()),
                    spawned: 0,
                }
            }
        }
    }

    /// 在目前執行緒上同步執行。 / Runs synchronously on the calling thread.
    pub fn run(
        &self,
        file: &Path,
        language: LanguageId,
        sink: &dyn OutputSink,
        stop: &StopFlag,
    ) -> RunReport {
        let mut spawned = 0usize;
        let outcome = self.run_steps(file, language, sink, stop, &mut spawned);
        tracing::info!(language = %language, file = %file.display(), ?outcome, spawned, "run finished");
        RunReport { outcome, spawned }
    }

    /// 在背景執行緒執行。 / Runs on a dedicated background thread.
    pub fn spawn(
        self: &Arc<Self>,
        file: impl AsRef<Path>,
        language: LanguageId,
        sink: Arc<dyn OutputSink>,
        stop: StopFlag,
    ) -> JoinHandle<RunReport> {
        let dispatcher = Arc::clone(self);
        let file = file.as_ref().to_path_buf();
        thread::spawn(move || dispatcher.run(&file, language, sink.as_ref(), &stop))
    }

    /// 以未解析的語言標籤在背景執行。 / Like [`RunDispatcher::spawn`], taking an unparsed language tag.
    pub fn spawn_tag(
        self: &Arc<Self>,
        file: impl AsRef<Path>,
        tag: impl Into<String>,
        sink: Arc<dyn OutputSink>,
        stop: StopFlag,
    ) -> JoinHandle<RunReport> {
        let dispatcher = Arc::clone(self);
        let file = file.as_ref().to_path_buf();
        let tag = tag.into();
        thread::spawn(move || dispatcher.run_tag(&file, &tag, sink.as_ref(), &stop))
    }

    fn run_steps(
        &self,
        file: &Path,
        language: LanguageId,
        sink: &dyn OutputSink,
        stop: &StopFlag,
        spawned: &mut usize,
    ) -> RunOutcome {
        let Some(plan) = RunPlan::resolve(file, language, self.timeout) else {
            sink.append("Unknown language: cannot run.\n");
            return RunOutcome::UnknownLanguage(language.to_string());
        };

        if let Some(missing) = plan
            .requires
            .iter()
            .find(|tool| !self.probe.is_available(tool))
        {
            sink.append(&format!("{}\n", plan.missing));
            return RunOutcome::MissingTool((*missing).to_string());
        }

        for step in &plan.steps {
            if !self.condition_holds(step.when, &plan) {
                continue;
            }
            if stop.is_requested() {
                tracing::debug!("stop requested; skipping remaining steps");
                return RunOutcome::Stopped;
            }
            match &step.action {
                PlannedAction::Process { role, spec, probe } => {
                    if *probe && !self.probe.is_available(&spec.program) {
                        sink.append(&format!("{} not found in PATH.\n", spec.program));
                        return RunOutcome::MissingTool(spec.program.clone());
                    }
                    *spawned += 1;
                    let result = self.runner.run(spec);
                    let failed = result.exit_code != 0;
                    if *role == StepRole::Execute || failed {
                        append_result(sink, &result);
                    }
                    if failed && role.aborts_on_failure() {
                        return RunOutcome::StepFailed {
                            program: spec.program.clone(),
                            exit_code: result.exit_code,
                        };
                    }
                }
                PlannedAction::OpenBrowser { target, note } => {
                    if let Err(err) = self.browser.open(target) {
                        tracing::warn!(target = %target.display(), error = %err, "browser launch failed");
                        sink.append(&format!("Error: {err}\n"));
                        return RunOutcome::Failed(err.to_string());
                    }
                    sink.append(&format!("{note}\n"));
                }
            }
        }
        RunOutcome::Completed
    }

    fn condition_holds(&self, condition: Condition, plan: &RunPlan) -> bool {
        let file_name = plan
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match condition {
            Condition::Always => true,
            Condition::ToolPresent(tool) => self.probe.is_available(tool),
            Condition::ToolMissing(tool) => !self.probe.is_available(tool),
            Condition::NoFileWithExtension(extension) => !dir_has_extension(&plan.working_dir, extension),
            Condition::FileNamed(name) => file_name == name,
            Condition::FileNotNamed(name) => file_name != name,
        }
    }
}

fn append_result(sink: &dyn OutputSink, result: &RunResult) {
    if !result.stdout.is_empty() {
        sink.append(&result.stdout);
    }
    if !result.stderr.is_empty() {
        sink.append(&result.stderr);
    }
}

fn dir_has_extension(dir: &Path, extension: &str) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    })
}
