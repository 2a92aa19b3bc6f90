use std::sync::Arc;

use finrag_core::controller::{Command, Dispatch, Phase, UiEvent};
use finrag_core::{Backend, Controller};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Ticker,
    Suggestions,
    Chat,
    Question,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Ticker => FocusPane::Suggestions,
            FocusPane::Suggestions => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Question,
            FocusPane::Question => FocusPane::Ticker,
        }
    }

    pub fn is_text_field(self) -> bool {
        matches!(self, FocusPane::Ticker | FocusPane::Question)
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub controller: Controller,

    // Cursor positions, in characters
    pub ticker_cursor: usize,
    pub question_cursor: usize,

    pub suggestion_state: ListState,

    // Chat scrolling
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    /// Last refused action, shown in the footer until the next key press
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub api_url: String,
    pub backend: Arc<dyn Backend>,
    pub events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        controller: Controller,
        backend: Arc<dyn Backend>,
        api_url: String,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let mut suggestion_state = ListState::default();
        if !controller.suggestions().is_empty() {
            suggestion_state.select(Some(0));
        }

        let ticker_cursor = controller.inputs().ticker.chars().count();
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Question,
            controller,
            ticker_cursor,
            question_cursor: 0,
            suggestion_state,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            status: None,
            animation_frame: 0,
            api_url,
            backend,
            events,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.controller.phase() != Phase::Idle
    }

    /// Feed an event to the controller and start any network work it asks for.
    pub fn apply(&mut self, event: UiEvent) {
        match self.controller.dispatch(event) {
            Dispatch::Execute(command) => {
                self.status = None;
                if matches!(command, Command::Query { .. }) {
                    self.question_cursor = 0;
                }
                self.spawn(command);
            }
            Dispatch::Accepted => {}
            Dispatch::Rejected(rejection) => self.status = Some(rejection.to_string()),
        }
        self.scroll_chat_to_bottom();
    }

    fn spawn(&self, command: Command) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let completion = finrag_core::execute(backend.as_ref(), command).await;
            // The receiver only goes away when the app is shutting down
            let _ = events.send(AppEvent::Completed(completion));
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn selected_suggestion(&self) -> Option<usize> {
        self.suggestion_state
            .selected()
            .filter(|i| *i < self.controller.suggestions().len())
    }

    pub fn suggestion_down(&mut self) {
        let len = self.controller.suggestions().len();
        if len == 0 {
            return;
        }
        let i = self.suggestion_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.suggestion_state.select(Some(i));
    }

    pub fn suggestion_up(&mut self) {
        let i = self.suggestion_state.selected().unwrap_or(0).saturating_sub(1);
        self.suggestion_state.select(Some(i));
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat so the newest message (or the pending indicator) is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.controller.log().messages() {
            total_lines += 1; // "You:" / "AI:"
            if msg.is_pending() {
                total_lines += 1;
            }
            for line in msg.body.lines() {
                let char_count = line.chars().count();
                total_lines += (char_count / wrap_width) + 1;
            }
            total_lines += 1;
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        // Paragraph scroll offsets are u16; pin very long sessions to the end
        let hidden = total_lines.saturating_sub(visible_height as usize);
        self.chat_scroll = u16::try_from(hidden).unwrap_or(u16::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::api::QueryPayload;
    use finrag_core::{ContextStore, RequestOutcome};

    use crate::test_support::StaticBackend;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller = Controller::with_default_suggestions(ContextStore::in_memory());
        controller.set_context("AAPL").unwrap();
        App::new(
            controller,
            Arc::new(StaticBackend::offline()),
            "http://localhost:8000".to_string(),
            tx,
        )
    }

    fn answer(app: &mut App, body: String) {
        app.controller.submit_query("Revenue?").unwrap();
        app.controller.query_completed(RequestOutcome::Success(QueryPayload {
            answer: body,
            query_type: None,
            confidence: None,
            sources: vec![],
        }));
    }

    #[test]
    fn test_scroll_to_bottom_short_chat() {
        let mut app = app();
        app.chat_width = 40;
        app.chat_height = 10;
        answer(&mut app, "line\n".repeat(20));

        app.scroll_chat_to_bottom();
        // question: 1 + 1 + 1, answer: 1 + 20 + 1
        assert_eq!(app.chat_scroll, 25 - 10);
    }

    #[test]
    fn test_scroll_to_bottom_clamps_long_sessions() {
        let mut app = app();
        for _ in 0..40 {
            answer(&mut app, "line\n".repeat(2000));
        }

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX);
    }
}
