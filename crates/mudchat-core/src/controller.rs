//! Application controller: turns user actions into session client calls and
//! keeps the state a front end renders.
//!
//! The game itself is a two-phase machine. Starting or loading a game moves
//! it to `InProgress` and replaces the transcript; sending a message appends
//! to it. Errors never roll the transcript back, they only withhold the reply.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{GameApi, GameState, GameTurnResult, HttpGameApi};
use crate::config::Config;
use crate::conversation::{ChatEntry, ConversationLog};
use crate::error::ClientError;
use crate::session::{SavedSessionSummary, SessionClient};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    InProgress,
}

/// Set while a remote operation is in flight.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns `None` when the flag is already held.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

/// Clears the busy flag when dropped.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GameController<A: GameApi = HttpGameApi> {
    client: SessionClient<A>,
    phase: Phase,
    log: ConversationLog,
    game_state: Option<GameState>,
    busy: BusyFlag,
    error: Option<String>,
    theme: Theme,
    saved_sessions: Vec<SavedSessionSummary>,
    dark_mode: bool,
    prefs_path: Option<PathBuf>,
}

impl<A: GameApi> GameController<A> {
    pub fn new(client: SessionClient<A>) -> Self {
        Self {
            client,
            phase: Phase::NotStarted,
            log: ConversationLog::new(),
            game_state: None,
            busy: BusyFlag::default(),
            error: None,
            theme: Theme::default(),
            saved_sessions: Vec::new(),
            dark_mode: false,
            prefs_path: None,
        }
    }

    /// Seeds theme and display mode from `config`; display mode changes are
    /// written back to `prefs_path`.
    pub fn with_preferences(mut self, config: &Config, prefs_path: PathBuf) -> Self {
        self.theme = config.theme();
        self.dark_mode = config.dark_mode;
        self.prefs_path = Some(prefs_path);
        self
    }

    pub fn session(&self) -> &SessionClient<A> {
        &self.client
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.client.current_session_id()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Engine state from the latest turn that carried one.
    pub fn game_state(&self) -> Option<&GameState> {
        self.game_state.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_set()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Takes effect at the next start; a running game keeps its theme.
    pub fn select_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn saved_sessions(&self) -> &[SavedSessionSummary] {
        &self.saved_sessions
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Starts a new game with the selected theme, replacing the transcript.
    /// Returns whether the game started.
    pub async fn start_game(&mut self) -> bool {
        let Some(_busy) = self.busy.try_acquire() else {
            return false;
        };
        self.start_game_locked().await
    }

    async fn start_game_locked(&mut self) -> bool {
        self.error = None;

        let outcome = self
            .client
            .start_game(self.theme)
            .await
            .and_then(GameTurnResult::into_outcome);

        match outcome {
            Ok(result) => {
                info!(theme = %self.theme, session_id = ?result.session_id, "game started");
                self.game_state = result.game_state;
                self.log.replace_with(vec![ChatEntry::system(result.message)]);
                self.phase = Phase::InProgress;
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to start game");
                self.error = Some(format!("Error starting new game: {}", err));
                false
            }
        }
    }

    /// Resumes a saved game. Returns whether it loaded.
    pub async fn load_game(&mut self, session_id: &str) -> bool {
        let Some(_busy) = self.busy.try_acquire() else {
            return false;
        };
        self.error = None;

        let outcome = self
            .client
            .load_game(session_id)
            .await
            .and_then(GameTurnResult::into_outcome);

        match outcome {
            Ok(result) => {
                let saved_theme = result.theme().map(str::to_string);
                let welcome = format!(
                    "Welcome back to your {} adventure!\n{}",
                    saved_theme.as_deref().unwrap_or(self.theme.as_str()),
                    result.message
                );
                if let Some(theme) = saved_theme.as_deref().and_then(Theme::from_str) {
                    self.theme = theme;
                }
                info!(session_id, theme = %self.theme, "game loaded");
                self.game_state = result.game_state;
                self.log.replace_with(vec![ChatEntry::system(welcome)]);
                self.phase = Phase::InProgress;
                true
            }
            Err(err) => {
                warn!(session_id, error = %err, "failed to load game");
                self.error = Some(format!("Error loading game: {}", err));
                false
            }
        }
    }

    /// Sends one command. The user's text is appended before the call and
    /// stays even when the turn fails.
    ///
    /// With no active session this starts a new game instead, and the text
    /// is never sent as a command. Since starting replaces the transcript,
    /// the typed text does not survive either.
    ///
    /// Returns whether a reply was appended (or, in the no-session case,
    /// whether the game started).
    pub async fn send_message(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(_busy) = self.busy.try_acquire() else {
            return false;
        };

        self.log.push(ChatEntry::user(text));
        self.error = None;

        if self.client.current_session_id().is_none() {
            info!("no active session, starting a new game");
            return self.start_game_locked().await;
        }

        let outcome = self
            .client
            .send_command(text, self.theme)
            .await
            .and_then(GameTurnResult::into_outcome);

        match outcome {
            Ok(result) => {
                if result.game_state.is_some() {
                    self.game_state = result.game_state;
                }
                if result.message.is_empty() {
                    return false;
                }
                self.log.push(ChatEntry::system(result.message));
                true
            }
            Err(ClientError::Game(message)) => {
                warn!(error = %message, "server rejected command");
                self.error = Some(message);
                false
            }
            Err(err) => {
                warn!(error = %err, "failed to send command");
                self.error = Some(format!("Error sending message: {}", err));
                false
            }
        }
    }

    /// Rebuilds the saved session list. On failure the previous list stays.
    pub async fn refresh_saved_sessions(&mut self) -> bool {
        match self.client.list_saved_sessions().await {
            Ok(sessions) => {
                self.saved_sessions = sessions;
                true
            }
            Err(err) => {
                warn!(error = %err, "Error loading saved sessions");
                false
            }
        }
    }

    /// Flips light/dark display and persists the new value. Returns it.
    ///
    /// The mode only changes once the preference is stored.
    pub fn toggle_display_mode(&mut self) -> Result<bool> {
        let dark_mode = !self.dark_mode;

        if let Some(path) = &self.prefs_path {
            let mut config = Config::load_from(path)?;
            config.dark_mode = dark_mode;
            config.save_to(path)?;
        }

        self.dark_mode = dark_mode;
        Ok(dark_mode)
    }
}
