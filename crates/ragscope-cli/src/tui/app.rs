use ragscope_core::view::{LoadTicket, SessionViewer, SliceRequest};
use ragscope_core::{Block, LogEvent, SessionSummary};

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Sessions,
    Transcript,
    Debug,
}

impl Panel {
    pub fn next(self) -> Self {
        match self {
            Panel::Sessions => Panel::Transcript,
            Panel::Transcript => Panel::Debug,
            Panel::Debug => Panel::Sessions,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Sessions => Panel::Debug,
            Panel::Transcript => Panel::Sessions,
            Panel::Debug => Panel::Transcript,
        }
    }
}

/// Work handed to the retrieval worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Sessions(LoadTicket),
    Session(LoadTicket),
}

/// A finished retrieval. Errors are carried as display text.
#[derive(Debug)]
pub enum Loaded {
    Sessions(LoadTicket, Result<Vec<SessionSummary>, String>),
    Session(LoadTicket, Result<Vec<LogEvent>, String>),
}

/// Application state for the TUI.
pub struct App {
    pub source_label: String,
    pub should_quit: bool,
    pub active_panel: Panel,

    // Data
    pub viewer: SessionViewer,
    pub sessions: Vec<SessionSummary>,
    pub sessions_error: Option<String>,
    pub detail_error: Option<String>,
    pub loading_sessions: bool,
    pub loading_session: Option<String>,

    // Session filter
    pub filter: String,
    pub editing_filter: bool,

    // Scroll positions (per panel)
    pub session_scroll: usize,
    pub transcript_scroll: usize,
    pub debug_scroll: usize,

    /// Block shown in the debug pane; `None` shows the whole log.
    pub debug_focus: Option<(Block, SliceRequest)>,

    outbox: Vec<LoadRequest>,
}

impl App {
    pub fn new(source_label: String) -> Self {
        Self {
            source_label,
            should_quit: false,
            active_panel: Panel::Sessions,
            viewer: SessionViewer::new(),
            sessions: Vec::new(),
            sessions_error: None,
            detail_error: None,
            loading_sessions: false,
            loading_session: None,
            filter: String::new(),
            editing_filter: false,
            session_scroll: 0,
            transcript_scroll: 0,
            debug_scroll: 0,
            debug_focus: None,
            outbox: Vec::new(),
        }
    }

    /// Requests queued since the last call, for the worker.
    pub fn take_requests(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub fn visible_sessions(&self) -> Vec<&SessionSummary> {
        ragscope_store::filter_sessions(&self.sessions, &self.filter)
    }

    pub fn selected_session(&self) -> Option<&SessionSummary> {
        self.visible_sessions().get(self.session_scroll).copied()
    }

    pub fn request_sessions(&mut self) {
        let ticket = self.viewer.begin_list_load();
        self.loading_sessions = true;
        self.outbox.push(LoadRequest::Sessions(ticket));
    }

    fn request_session(&mut self, session_id: &str) {
        let ticket = self.viewer.begin_session_load(session_id);
        self.loading_session = Some(session_id.to_string());
        self.outbox.push(LoadRequest::Session(ticket));
    }

    /// Apply a worker result. Results for superseded requests are dropped.
    pub fn apply(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Sessions(ticket, result) => {
                if !self.viewer.accepts_list(&ticket) {
                    tracing::debug!(seq = ticket.seq(), "discarding stale sessions list");
                    return;
                }
                self.loading_sessions = false;
                match result {
                    Ok(sessions) => {
                        self.sessions = sessions;
                        self.sessions_error = None;
                    }
                    Err(e) => {
                        self.sessions.clear();
                        self.sessions_error = Some(format!("Error loading sessions: {e}"));
                    }
                }
                self.clamp_session_scroll();
            }
            Loaded::Session(ticket, result) => {
                if !self.viewer.accepts_session(&ticket) {
                    tracing::debug!(
                        seq = ticket.seq(),
                        session_id = ticket.session_id(),
                        "discarding stale session load"
                    );
                    return;
                }
                self.loading_session = None;
                self.debug_focus = None;
                self.transcript_scroll = 0;
                self.debug_scroll = 0;
                match result {
                    Ok(log) => {
                        self.detail_error = None;
                        self.viewer.commit_session(&ticket, log);
                    }
                    Err(e) => {
                        self.viewer.clear();
                        self.detail_error = Some(format!("Error loading history: {e}"));
                    }
                }
            }
        }
    }

    /// Number of transcript rows: the setup row plus one per turn.
    pub fn transcript_rows(&self) -> usize {
        self.viewer
            .active()
            .map(|v| 1 + v.transcript().turns.len())
            .unwrap_or(0)
    }

    pub fn row_block(row: usize) -> Block {
        if row == 0 {
            Block::Setup
        } else {
            Block::Turn(row - 1)
        }
    }

    /// Events for the debug pane, or the placeholder to show instead.
    pub fn debug_events(&self) -> Result<&[LogEvent], String> {
        let Some(view) = self.viewer.active() else {
            return Err(self
                .detail_error
                .clone()
                .unwrap_or_else(|| "Select a session to inspect its log.".to_string()));
        };
        if view.log().is_empty() {
            return Err("No logs found for this session.".to_string());
        }
        let Some((_, req)) = &self.debug_focus else {
            return Ok(view.log());
        };
        match view.resolve(req) {
            Some([]) => Err("No log events in this interaction.".to_string()),
            Some(events) => Ok(events),
            None => Ok(view.log()),
        }
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
        use crossterm::event::KeyCode;

        if self.editing_filter {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.editing_filter = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                    self.session_scroll = 0;
                }
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    self.session_scroll = 0;
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.active_panel = self.active_panel.next(),
            KeyCode::BackTab => self.active_panel = self.active_panel.prev(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(),
            KeyCode::Char('/') => {
                self.active_panel = Panel::Sessions;
                self.editing_filter = true;
            }
            KeyCode::Char('r') => self.request_sessions(),
            KeyCode::Char('a') => {
                self.debug_focus = None;
                self.debug_scroll = 0;
            }
            KeyCode::Enter => self.select(),
            _ => {}
        }
    }

    fn select(&mut self) {
        match self.active_panel {
            Panel::Sessions => {
                if let Some(id) = self.selected_session().map(|s| s.session_id.clone()) {
                    self.request_session(&id);
                }
            }
            Panel::Transcript => {
                let block = Self::row_block(self.transcript_scroll);
                if let Some(req) = self.viewer.active().and_then(|v| v.request(block)) {
                    self.debug_focus = Some((block, req));
                    self.debug_scroll = 0;
                }
            }
            Panel::Debug => {}
        }
    }

    fn clamp_session_scroll(&mut self) {
        let len = self.visible_sessions().len();
        self.session_scroll = self.session_scroll.min(len.saturating_sub(1));
    }

    fn scroll_down(&mut self) {
        let (scroll, max) = self.active_scroll_and_max();
        if scroll < max.saturating_sub(1) {
            *self.active_scroll_mut() += 1;
        }
    }

    fn scroll_up(&mut self) {
        let scroll = self.active_scroll_mut();
        *scroll = scroll.saturating_sub(1);
    }

    fn active_scroll_and_max(&self) -> (usize, usize) {
        match self.active_panel {
            Panel::Sessions => (self.session_scroll, self.visible_sessions().len()),
            Panel::Transcript => (self.transcript_scroll, self.transcript_rows()),
            Panel::Debug => (
                self.debug_scroll,
                self.debug_events().map(|e| e.len()).unwrap_or(0),
            ),
        }
    }

    fn active_scroll_mut(&mut self) -> &mut usize {
        match self.active_panel {
            Panel::Sessions => &mut self.session_scroll,
            Panel::Transcript => &mut self.transcript_scroll,
            Panel::Debug => &mut self.debug_scroll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ragscope_core::EventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn summary(id: &str) -> SessionSummary {
        SessionSummary {
            session_id: id.into(),
            start_time: "2025-01-01T10:00:00.000+05:30".into(),
            last_activity: "2025-01-01T10:00:05.000+05:30".into(),
            event_count: 5,
        }
    }

    fn session_log(question: &str) -> Vec<LogEvent> {
        vec![
            LogEvent::new(EventKind::NewSession),
            LogEvent::new(EventKind::BotWaitingForInput),
            LogEvent::new(EventKind::UserQuestionReceived).with_field("question", question),
            LogEvent::new(EventKind::AnswerGenerated).with_field("full_answer", "ok"),
            LogEvent::new(EventKind::BotWaitingForInput),
        ]
    }

    /// App with a loaded sessions list.
    fn app_with_sessions(ids: &[&str]) -> App {
        let mut app = App::new("test".into());
        app.request_sessions();
        let Some(LoadRequest::Sessions(ticket)) = app.take_requests().pop() else {
            panic!("expected a sessions request");
        };
        app.apply(Loaded::Sessions(
            ticket,
            Ok(ids.iter().map(|id| summary(id)).collect()),
        ));
        app
    }

    fn open_selected(app: &mut App, log: Vec<LogEvent>) {
        app.handle_key(key(KeyCode::Enter));
        let Some(LoadRequest::Session(ticket)) = app.take_requests().pop() else {
            panic!("expected a session request");
        };
        app.apply(Loaded::Session(ticket, Ok(log)));
    }

    #[test]
    fn panel_cycles() {
        assert_eq!(Panel::Sessions.next(), Panel::Transcript);
        assert_eq!(Panel::Debug.next(), Panel::Sessions);
        assert_eq!(Panel::Sessions.prev(), Panel::Debug);
    }

    #[test]
    fn tab_and_quit_keys() {
        let mut app = App::new("test".into());
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_panel, Panel::Transcript);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.active_panel, Panel::Sessions);
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn filter_editing_narrows_sessions() {
        let mut app = app_with_sessions(&["alpha-1", "beta-2", "alpha-3"]);
        app.handle_key(key(KeyCode::Char('/')));
        assert!(app.editing_filter);
        for c in "ALPHA".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        // 'q' is text while editing
        assert!(!app.should_quit);
        assert_eq!(app.visible_sessions().len(), 2);
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.editing_filter);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_session().unwrap().session_id, "alpha-3");
    }

    #[test]
    fn enter_loads_selected_session() {
        let mut app = app_with_sessions(&["s1", "s2"]);
        app.handle_key(key(KeyCode::Char('j')));
        open_selected(&mut app, session_log("hello?"));
        let view = app.viewer.active().unwrap();
        assert_eq!(view.session_id(), "s2");
        assert_eq!(app.transcript_rows(), 2);
        assert_eq!(app.debug_events().unwrap().len(), 5);
        assert!(app.loading_session.is_none());
    }

    #[test]
    fn stale_session_result_is_ignored() {
        let mut app = app_with_sessions(&["s1", "s2"]);
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Enter));
        let mut requests = app.take_requests();
        let Some(LoadRequest::Session(second)) = requests.pop() else {
            panic!("expected second request");
        };
        let Some(LoadRequest::Session(first)) = requests.pop() else {
            panic!("expected first request");
        };

        app.apply(Loaded::Session(second, Ok(session_log("from s2"))));
        app.apply(Loaded::Session(first, Ok(session_log("from s1"))));

        let view = app.viewer.active().unwrap();
        assert_eq!(view.session_id(), "s2");
        assert_eq!(view.transcript().turns[0].question, "from s2");
    }

    #[test]
    fn stale_sessions_list_is_ignored() {
        let mut app = App::new("test".into());
        app.request_sessions();
        app.request_sessions();
        let mut requests = app.take_requests();
        let Some(LoadRequest::Sessions(newer)) = requests.pop() else {
            panic!("expected request");
        };
        let Some(LoadRequest::Sessions(older)) = requests.pop() else {
            panic!("expected request");
        };
        app.apply(Loaded::Sessions(newer, Ok(vec![summary("new")])));
        app.apply(Loaded::Sessions(older, Ok(vec![summary("old")])));
        assert_eq!(app.sessions.len(), 1);
        assert_eq!(app.sessions[0].session_id, "new");
        assert!(!app.loading_sessions);
    }

    #[test]
    fn transcript_enter_focuses_debug_slice() {
        let mut app = app_with_sessions(&["s1"]);
        open_selected(&mut app, session_log("q"));
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Enter));
        let events = app.debug_events().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event, EventKind::UserQuestionReceived);

        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.debug_events().unwrap().len(), 5);
    }

    #[test]
    fn load_failure_replaces_view_with_message() {
        let mut app = app_with_sessions(&["s1"]);
        open_selected(&mut app, session_log("q"));
        app.handle_key(key(KeyCode::Enter));
        let Some(LoadRequest::Session(ticket)) = app.take_requests().pop() else {
            panic!("expected request");
        };
        app.apply(Loaded::Session(ticket, Err("connection refused".into())));
        assert!(app.viewer.active().is_none());
        assert_eq!(
            app.debug_events().unwrap_err(),
            "Error loading history: connection refused"
        );
    }

    #[test]
    fn empty_session_and_empty_list_placeholders() {
        let mut app = app_with_sessions(&["s1"]);
        open_selected(&mut app, Vec::new());
        assert_eq!(app.debug_events().unwrap_err(), "No logs found for this session.");

        let mut app = App::new("test".into());
        app.request_sessions();
        let Some(LoadRequest::Sessions(ticket)) = app.take_requests().pop() else {
            panic!("expected request");
        };
        app.apply(Loaded::Sessions(ticket, Err("boom".into())));
        assert_eq!(
            app.sessions_error.as_deref(),
            Some("Error loading sessions: boom")
        );
    }
}
