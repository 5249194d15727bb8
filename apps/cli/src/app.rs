use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use vanilla_core::{Document, EditKey, EditorTab, PollOutcome};
use vanilla_highlight::{Highlighter, LanguageId, Strategy, TextPosition};
use vanilla_project::{Activation, TreeNodeId, WorkspaceTree};
use vanilla_runexec::{OutputSink, RunDispatcher, RunReport, StopFlag};
use vanilla_settings::Preferences;

const STATUS_READY: &str = "Ready";

/// 關閉分頁的結果。 / Result of a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// 未存檔的新分頁需要強制關閉。 / Untitled tab; the caller must confirm with `force`.
    NeedsConfirmation,
    NoTab,
}

/// 應用程式狀態：分頁、工作區、主控台與執行中的工作。 / Application context owning tabs, workspace, console and the run worker.
pub struct StudioApp {
    preferences: Preferences,
    highlighter: Highlighter,
    dispatcher: Arc<RunDispatcher>,
    console: Arc<dyn OutputSink>,
    stop: StopFlag,
    tabs: Vec<EditorTab>,
    current: Option<usize>,
    workspace: Option<WorkspaceTree>,
    status: String,
    worker: Option<JoinHandle<RunReport>>,
}

impl StudioApp {
    pub fn new(preferences: Preferences, console: Arc<dyn OutputSink>) -> Self {
        let highlighter = Highlighter::new(preferences.highlight.strategy);
        let dispatcher = RunDispatcher::new(preferences.run.timeout());
        Self {
            preferences,
            highlighter,
            dispatcher: Arc::new(dispatcher),
            console,
            stop: StopFlag::new(),
            tabs: Vec::new(),
            current: None,
            workspace: None,
            status: STATUS_READY.to_string(),
            worker: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: RunDispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn with_highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// 啟動時開一個新分頁，並提示外部分詞器是否可用。 / Opens the first tab and notes a missing external lexer.
    pub fn start(&mut self) -> usize {
        let index = self.new_tab(self.preferences.editor.language());
        if self.preferences.highlight.strategy != Strategy::Regex && !self.highlighter.has_preferred() {
            self.console
                .append("Note: external lexer not available; using regex highlighting.\n");
        }
        index
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        tracing::debug!(status = %self.status, "status updated");
    }

    pub fn tabs(&self) -> &[EditorTab] {
        &self.tabs
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_tab(&self) -> Option<&EditorTab> {
        self.current.and_then(|index| self.tabs.get(index))
    }

    pub fn current_tab_mut(&mut self) -> Option<&mut EditorTab> {
        self.current.and_then(|index| self.tabs.get_mut(index))
    }

    pub fn select_tab(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    fn push_tab(&mut self, document: Document) -> usize {
        let editor = &self.preferences.editor;
        let mut tab = EditorTab::new(document).with_timing(
            editor.indent_width,
            editor.highlight_debounce(),
            editor.line_number_debounce(),
        );
        tab.refresh_now(&self.highlighter);
        self.tabs.push(tab);
        let index = self.tabs.len() - 1;
        self.current = Some(index);
        index
    }

    /// 以語言範本開新分頁。 / New untitled tab seeded with the language's sample.
    pub fn new_tab(&mut self, language: LanguageId) -> usize {
        let index = self.push_tab(Document::untitled(language));
        self.set_status("New file");
        index
    }

    /// 依副檔名決定語言開啟檔案。 / Opens a file; the language comes from its extension.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        self.open_file_as(path, None)
    }

    /// 可指定語言覆寫副檔名推定。 / Like [`StudioApp::open_file`] with an optional language override.
    pub fn open_file_as(&mut self, path: impl AsRef<Path>, language: Option<LanguageId>) -> Result<usize> {
        let path = path.as_ref();
        let document = match language {
            Some(language) => Document::open_as(path, language)?,
            None => Document::open(path)?,
        };
        let index = self.push_tab(document);
        self.set_status(format!("Opened {}", path.display()));
        Ok(index)
    }

    /// 存檔；未命名分頁需改用 [`StudioApp::save_as`]。 / Saves the current tab; untitled tabs need [`StudioApp::save_as`].
    pub fn save(&mut self) -> Result<PathBuf> {
        let tab = self.current_tab_mut().ok_or_else(|| anyhow!("no open tab"))?;
        let saved = tab.document_mut().save()?;
        self.console.append(&format!("Saved: {}\n", saved.display()));
        self.set_status(format!("Saved {}", saved.display()));
        Ok(saved)
    }

    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let tab = self.current_tab_mut().ok_or_else(|| anyhow!("no open tab"))?;
        let saved = tab.document_mut().save_as(path)?;
        self.console.append(&format!("Saved as: {}\n", saved.display()));
        self.set_status(format!("Saved {}", saved.display()));
        Ok(saved)
    }

    pub fn close_tab(&mut self, force: bool) -> CloseOutcome {
        let Some(index) = self.current else {
            return CloseOutcome::NoTab;
        };
        if self.tabs[index].document().is_untitled() && !force {
            return CloseOutcome::NeedsConfirmation;
        }
        self.tabs.remove(index);
        self.current = if self.tabs.is_empty() {
            None
        } else {
            Some(index.min(self.tabs.len() - 1))
        };
        self.set_status("Tab closed");
        CloseOutcome::Closed
    }

    /// 把按鍵送到目前分頁。 / Routes a keystroke to the current tab.
    pub fn handle_key(&mut self, key: EditKey, now: Instant) -> Result<()> {
        let tab = self.current_tab_mut().ok_or_else(|| anyhow!("no open tab"))?;
        tab.handle_key(key, now)?;
        Ok(())
    }

    /// 執行到期的延遲重算。 / Runs debounced refreshes that are due on the current tab.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        let Some(index) = self.current else {
            return PollOutcome::default();
        };
        self.tabs[index].poll(now, &self.highlighter)
    }

    /// 尋找並選取；回傳行列。 / Finds and selects `needle` in the current tab.
    pub fn find(&mut self, needle: &str) -> Option<TextPosition> {
        let document = self.current_tab_mut()?.document_mut();
        let range = document.find(needle)?;
        Some(document.position_of(range.start))
    }

    pub fn open_workspace(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        let tree = WorkspaceTree::scan(root, self.preferences.workspace.tree_depth)
            .with_context(|| format!("failed to open workspace {}", root.display()))?;
        self.workspace = Some(tree);
        Ok(())
    }

    pub fn close_workspace(&mut self) {
        self.workspace = None;
    }

    pub fn workspace(&self) -> Option<&WorkspaceTree> {
        self.workspace.as_ref()
    }

    pub fn workspace_label(&self) -> String {
        match &self.workspace {
            Some(tree) => format!("Workspace: {}", tree.name()),
            None => "Workspace: (none)".to_string(),
        }
    }

    /// 展開目錄或在分頁中開啟檔案。 / Toggles a directory node or opens a file node in a tab.
    pub fn activate_node(&mut self, id: TreeNodeId) -> Result<Activation> {
        let tree = self
            .workspace
            .as_mut()
            .ok_or_else(|| anyhow!("no workspace is open"))?;
        let activation = tree.activate(id)?;
        if let Activation::OpenFile(path) = &activation {
            self.open_file(path)?;
        }
        Ok(activation)
    }

    /// 在背景執行目前已存檔的分頁。 / Runs the current, saved tab on a background worker.
    pub fn run_current(&mut self) -> Result<()> {
        self.run_current_as(None)
    }

    /// 可用語言標籤覆寫分頁語言；未知標籤只輸出訊息。 / Runs with an optional language tag overriding the tab's language; unknown tags only print a message.
    pub fn run_current_as(&mut self, tag: Option<&str>) -> Result<()> {
        let tab = self.current_tab().ok_or_else(|| anyhow!("no open tab"))?;
        let Some(path) = tab.document().path().map(Path::to_path_buf) else {
            bail!("file must be saved before running");
        };
        let (label, worker_tag) = match tag.map(|tag| (tag, tag.parse::<LanguageId>())) {
            None => (tab.language().to_string(), None),
            Some((_, Ok(language))) => (language.to_string(), Some(language.to_string())),
            Some((raw, Err(_))) => (raw.to_string(), Some(raw.to_string())),
        };
        let language = tab.language();
        self.console
            .append(&format!("Running {} ({})...\n", tab.title(), label));
        self.stop.clear();
        let sink = Arc::clone(&self.console);
        let stop = self.stop.clone();
        self.worker = Some(match worker_tag {
            Some(tag) => self.dispatcher.spawn_tag(path, tag, sink, stop),
            None => self.dispatcher.spawn(path, language, sink, stop),
        });
        self.set_status("Running...");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// 等待背景工作結束。 / Blocks until the run worker finishes.
    pub fn wait_for_run(&mut self) -> Option<RunReport> {
        let worker = self.worker.take()?;
        let report = match worker.join() {
            Ok(report) => Some(report),
            Err(_) => {
                self.console.append("Error: run worker panicked\n");
                None
            }
        };
        if self.status != "Stopped" {
            self.set_status(STATUS_READY);
        }
        report
    }

    /// 協作式停止：只阻止尚未開始的步驟。 / Cooperative stop; running processes are left alone.
    pub fn stop(&mut self) {
        self.stop.request();
        self.console.append(
            "Stop requested (best-effort). If an external process started, stop it manually.\n",
        );
        self.set_status("Stopped");
    }
}
