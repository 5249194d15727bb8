use std::time::{Duration, Instant};

use vanilla_highlight::{Highlighter, LanguageId, Span};

use crate::debounce::Debouncer;
use crate::document::Document;
use crate::editing;
use crate::editor::EditorError;

/// 標記與行號重算的預設延遲。 / Default delays before re-highlighting and refreshing the gutter.
pub const HIGHLIGHT_DEBOUNCE: Duration = Duration::from_millis(150);
pub const GUTTER_DEBOUNCE: Duration = Duration::from_millis(50);

/// 分頁可處理的按鍵。 / Keystrokes an editor tab understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Char(char),
    Enter,
    Tab,
    Backspace,
    ToggleComment,
}

/// 一次輪詢中完成的工作。 / Work performed by one [`EditorTab::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub highlighted: bool,
    pub gutter_refreshed: bool,
}

/// 編輯分頁：文件加上標記結果、行號與延遲重算。 / An editor tab: document plus its spans, gutter and debounced refreshes.
#[derive(Debug, Clone)]
pub struct EditorTab {
    document: Document,
    spans: Vec<Span>,
    gutter: String,
    indent_unit: String,
    highlight_debounce: Debouncer,
    gutter_debounce: Debouncer,
}

impl EditorTab {
    pub fn new(document: Document) -> Self {
        let gutter = document.gutter();
        Self {
            document,
            spans: Vec::new(),
            gutter,
            indent_unit: editing::INDENT_UNIT.to_string(),
            highlight_debounce: Debouncer::new(HIGHLIGHT_DEBOUNCE),
            gutter_debounce: Debouncer::new(GUTTER_DEBOUNCE),
        }
    }

    /// 套用偏好設定中的縮排寬度與延遲。 / Applies indent width and debounce delays from preferences.
    pub fn with_timing(mut self, indent_width: usize, highlight: Duration, gutter: Duration) -> Self {
        self.indent_unit = " ".repeat(indent_width.max(1));
        self.highlight_debounce = Debouncer::new(highlight);
        self.gutter_debounce = Debouncer::new(gutter);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn language(&self) -> LanguageId {
        self.document.language()
    }

    pub fn title(&self) -> &str {
        self.document.title()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn gutter(&self) -> &str {
        &self.gutter
    }

    /// 處理按鍵並排程重算。 / Applies a keystroke and (re)schedules the refreshes.
    pub fn handle_key(&mut self, key: EditKey, now: Instant) -> Result<(), EditorError> {
        let language = self.document.language();
        let buffer = self.document.buffer_mut();
        match key {
            EditKey::Char(ch) => editing::type_char(buffer, ch)?,
            EditKey::Enter => editing::newline_with_indent(buffer, language, &self.indent_unit)?,
            EditKey::Tab => editing::indent(buffer, &self.indent_unit)?,
            EditKey::Backspace => editing::backspace(buffer, &self.indent_unit)?,
            EditKey::ToggleComment => editing::toggle_comment(buffer, language)?,
        }
        self.mark_edited(now);
        Ok(())
    }

    /// 文字被外部改動後呼叫。 / Call after the text changed by other means.
    pub fn mark_edited(&mut self, now: Instant) {
        self.highlight_debounce.schedule(now);
        self.gutter_debounce.schedule(now);
    }

    /// 執行到期的重算。 / Runs whichever refreshes are due.
    pub fn poll(&mut self, now: Instant, highlighter: &Highlighter) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if self.gutter_debounce.fire_if_due(now) {
            self.gutter = self.document.gutter();
            outcome.gutter_refreshed = true;
        }
        if self.highlight_debounce.fire_if_due(now) {
            self.rehighlight(highlighter);
            outcome.highlighted = true;
        }
        outcome
    }

    /// 立即重新標記並取消待辦排程。 / Re-highlights immediately, replacing all previous spans.
    pub fn refresh_now(&mut self, highlighter: &Highlighter) {
        self.highlight_debounce.cancel();
        self.gutter_debounce.cancel();
        self.gutter = self.document.gutter();
        self.rehighlight(highlighter);
    }

    fn rehighlight(&mut self, highlighter: &Highlighter) {
        self.spans = highlighter.spans(self.document.contents(), self.document.language());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanilla_highlight::Category;

    #[test]
    fn keystrokes_debounce_highlighting() {
        let highlighter = Highlighter::regex_only();
        let mut tab = EditorTab::new(Document::untitled(LanguageId::Python));
        tab.document_mut().set_contents("");
        tab.refresh_now(&highlighter);
        assert!(tab.spans().is_empty());

        let start = Instant::now();
        for (offset, ch) in "def".chars().enumerate() {
            tab.handle_key(EditKey::Char(ch), start + Duration::from_millis(offset as u64 * 100))
                .unwrap();
        }
        let last = start + Duration::from_millis(200);
        let early = tab.poll(last + Duration::from_millis(60), &highlighter);
        assert_eq!(
            early,
            PollOutcome {
                highlighted: false,
                gutter_refreshed: true
            }
        );
        let due = tab.poll(last + HIGHLIGHT_DEBOUNCE, &highlighter);
        assert!(due.highlighted);
        assert_eq!(tab.spans(), &[Span::new(0..3, Category::Keyword)]);
    }

    #[test]
    fn enter_updates_gutter_after_poll() {
        let highlighter = Highlighter::regex_only();
        let mut tab = EditorTab::new(Document::untitled(LanguageId::Go));
        tab.document_mut().set_contents("x");
        tab.refresh_now(&highlighter);
        assert_eq!(tab.gutter(), "1");

        let now = Instant::now();
        tab.document_mut().buffer_mut().move_to(1).unwrap();
        tab.handle_key(EditKey::Enter, now).unwrap();
        assert_eq!(tab.gutter(), "1");
        tab.poll(now + GUTTER_DEBOUNCE, &highlighter);
        assert_eq!(tab.gutter(), "1\n2");
    }

    #[test]
    fn indent_width_comes_from_timing() {
        let mut tab = EditorTab::new(Document::untitled(LanguageId::Lua)).with_timing(
            2,
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        tab.document_mut().set_contents("");
        tab.handle_key(EditKey::Tab, Instant::now()).unwrap();
        assert_eq!(tab.document().contents(), "  ");
    }
}
