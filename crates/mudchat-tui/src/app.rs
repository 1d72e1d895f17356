use mudchat_core::{
    ChatEntry, GameApi, GameController, GameState, Phase, SavedSessionSummary, Theme,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Remote work requested by a key press, run by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartGame,
    LoadGame(String),
    SendMessage(String),
    RefreshSessions,
}

impl Action {
    /// Spinner label while the action is in flight.
    pub fn label(&self, phase: Phase) -> &'static str {
        match self {
            Action::StartGame if phase == Phase::InProgress => "Generating...",
            Action::StartGame => "Starting...",
            Action::LoadGame(_) => "Loading...",
            Action::SendMessage(_) => "Thinking...",
            Action::RefreshSessions => "Fetching saved games...",
        }
    }

    pub async fn perform<A: GameApi>(self, controller: &mut GameController<A>) {
        match self {
            Action::StartGame => {
                controller.start_game().await;
            }
            Action::LoadGame(session_id) => {
                controller.load_game(&session_id).await;
            }
            Action::SendMessage(text) => {
                controller.send_message(&text).await;
            }
            Action::RefreshSessions => {
                controller.refresh_saved_sessions().await;
            }
        }
    }
}

/// What the screen shows, copied out of the controller so a frame can be
/// drawn while the controller is busy with a request.
#[derive(Debug, Clone)]
pub struct View {
    pub phase: Phase,
    pub entries: Vec<ChatEntry>,
    pub loading: Option<&'static str>,
    pub error: Option<String>,
    pub theme: Theme,
    pub saved_sessions: Vec<SavedSessionSummary>,
    pub dark_mode: bool,
    pub session_id: Option<String>,
    pub game_state: Option<GameState>,
}

impl View {
    pub fn capture<A: GameApi>(controller: &GameController<A>) -> Self {
        Self {
            phase: controller.phase(),
            entries: controller.log().entries().to_vec(),
            loading: controller.is_loading().then_some("Working..."),
            error: controller.error().map(str::to_string),
            theme: controller.theme(),
            saved_sessions: controller.saved_sessions().to_vec(),
            dark_mode: controller.dark_mode(),
            session_id: controller.current_session_id().map(str::to_string),
            game_state: controller.game_state().cloned(),
        }
    }

    /// The view while `action` runs: busy, with the command already echoed.
    pub fn in_flight(mut self, action: &Action) -> Self {
        self.loading = Some(action.label(self.phase));
        self.error = None;
        if let Action::SendMessage(text) = action {
            self.entries.push(ChatEntry::user(text.clone()));
        }
        self
    }

    /// Room, inventory and score from the latest game state, when any are known.
    pub fn game_summary(&self) -> Option<String> {
        let state = self.game_state.as_ref()?;
        let mut parts = Vec::new();
        if let Some(room) = state.room() {
            parts.push(format!("Room: {}", room));
        }
        let inventory = state.inventory();
        if !inventory.is_empty() {
            parts.push(format!("Inventory: {}", inventory.join(", ")));
        }
        if let Some(score) = state.score() {
            parts.push(format!("Score: {}", score));
        }
        (!parts.is_empty()).then(|| parts.join(" | "))
    }

    /// First eight characters of the session id.
    pub fn short_session_id(&self) -> Option<String> {
        self.session_id
            .as_ref()
            .map(|id| id.chars().take(8).collect())
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Command input
    pub input: String,
    pub cursor: usize,

    // Chat window
    pub chat_scroll: u16,
    pub chat_height: u16,
    /// Rows the transcript wraps to at the last drawn width.
    pub chat_rows: u16,
    pub follow_chat: bool,
    pub chat_area: Option<Rect>,

    // Welcome screen
    pub sessions_state: ListState,

    // Theme picker popup
    pub show_theme_picker: bool,
    pub theme_picker_state: ListState,

    pub animation_frame: usize,
    pub notice: Option<String>,
    pub pending_action: Option<Action>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_rows: 0,
            follow_chat: true,
            chat_area: None,

            sessions_state: ListState::default(),

            show_theme_picker: false,
            theme_picker_state: ListState::default(),

            animation_frame: 0,
            notice: None,
            pending_action: None,
        }
    }

    /// Queues remote work unless some is already waiting.
    pub fn request(&mut self, action: Action) -> bool {
        if self.pending_action.is_some() {
            return false;
        }
        self.pending_action = Some(action);
        true
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 4;
    }

    pub fn spinner(&self) -> &'static str {
        ["|", "/", "-", "\\"][self.animation_frame]
    }

    /// Takes the typed command, leaving the input empty.
    pub fn take_input(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.input)
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_chat = self.chat_scroll >= max;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_chat = true;
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        self.chat_rows.saturating_sub(self.chat_height)
    }

    // Saved session list
    pub fn session_nav_down(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let next = self
            .sessions_state
            .selected()
            .map(|i| (i + 1).min(count - 1))
            .unwrap_or(0);
        self.sessions_state.select(Some(next));
    }

    pub fn session_nav_up(&mut self) {
        let prev = self
            .sessions_state
            .selected()
            .map(|i| i.saturating_sub(1))
            .unwrap_or(0);
        self.sessions_state.select(Some(prev));
    }

    pub fn selected_session<'a>(
        &self,
        saved: &'a [SavedSessionSummary],
    ) -> Option<&'a SavedSessionSummary> {
        self.sessions_state.selected().and_then(|i| saved.get(i))
    }

    // Theme picker
    pub fn open_theme_picker(&mut self, current: Theme) {
        let idx = Theme::all().iter().position(|t| *t == current).unwrap_or(0);
        self.theme_picker_state.select(Some(idx));
        self.show_theme_picker = true;
    }

    pub fn theme_picker_nav_down(&mut self) {
        let count = Theme::all().len();
        let next = self
            .theme_picker_state
            .selected()
            .map(|i| (i + 1) % count)
            .unwrap_or(0);
        self.theme_picker_state.select(Some(next));
    }

    pub fn theme_picker_nav_up(&mut self) {
        let count = Theme::all().len();
        let prev = self
            .theme_picker_state
            .selected()
            .map(|i| if i == 0 { count - 1 } else { i - 1 })
            .unwrap_or(0);
        self.theme_picker_state.select(Some(prev));
    }

    pub fn picked_theme(&self) -> Option<Theme> {
        self.theme_picker_state
            .selected()
            .and_then(|i| Theme::all().get(i).copied())
    }
}
