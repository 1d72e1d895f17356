//! Session client: the game server operations plus the active session id.
//!
//! The active id is the only mutable state here. It starts unset, is set by
//! the first successful start or load, and from then on is attached to every
//! command. There is no way to clear it; the last write wins.

use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{CleanupReport, GameApi, GameTurnResult, HttpGameApi, MessageRequest};
use crate::error::{ClientError, ClientResult};
use crate::theme::Theme;

/// A saved game as presented in the "previous games" list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSessionSummary {
    pub id: String,
    pub theme: String,
    pub created_at: DateTime<Utc>,
}

impl SavedSessionSummary {
    fn from_details(id: String, details: &GameTurnResult) -> Self {
        let state = details.game_state.as_ref();
        Self {
            id,
            theme: state
                .and_then(|s| s.theme.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            created_at: state
                .and_then(|s| s.created_at())
                .unwrap_or_else(Utc::now),
        }
    }
}

pub struct SessionClient<A: GameApi = HttpGameApi> {
    api: A,
    session_id: Option<String>,
}

impl<A: GameApi> SessionClient<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            session_id: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn adopt(&mut self, session_id: &str) {
        if self.session_id.as_deref() != Some(session_id) {
            info!(session_id, previous = ?self.session_id, "active session changed");
            self.session_id = Some(session_id.to_string());
        }
    }

    /// Asks the server for a new game. The returned id supersedes any active
    /// session; the server is not told to drop the old one.
    pub async fn start_game(&mut self, theme: Theme) -> ClientResult<GameTurnResult> {
        let result = self.api.new_game(theme.as_str()).await?;

        if !result.is_failure() {
            if let Some(id) = result.session_id.as_deref() {
                self.adopt(id);
            }
        }

        Ok(result)
    }

    /// Sends one command for the active session. Without an active session
    /// nothing goes over the wire and a failure result is returned instead.
    pub async fn send_command(&mut self, text: &str, theme: Theme) -> ClientResult<GameTurnResult> {
        let Some(session_id) = self.session_id.clone() else {
            debug!("no active session, command not sent");
            return Ok(GameTurnResult::no_active_session());
        };

        let request = MessageRequest {
            message: text.to_string(),
            session_id,
            theme: theme.as_str().to_string(),
        };
        let result = self.api.send_message(&request).await?;

        if let Some(id) = result.session_id.as_deref() {
            self.adopt(id);
        }

        Ok(result)
    }

    /// Loads a saved game and makes it the active session. The id the server
    /// answers with wins over `session_id`.
    pub async fn load_game(&mut self, session_id: &str) -> ClientResult<GameTurnResult> {
        let result = self.api.load_game(session_id).await?;

        if !result.is_failure() {
            let id = result.session_id.as_deref().unwrap_or(session_id);
            self.adopt(id);
        }

        Ok(result)
    }

    pub async fn list_session_ids(&self) -> ClientResult<Vec<String>> {
        self.api.list_sessions().await
    }

    /// Lists saved sessions with their details. Details are fetched
    /// concurrently and any failure fails the whole listing. Fetching details
    /// never changes the active session.
    pub async fn list_saved_sessions(&self) -> ClientResult<Vec<SavedSessionSummary>> {
        let ids = self.list_session_ids().await?;
        debug!(count = ids.len(), "fetching saved session details");

        let fetches = ids.into_iter().map(|id| async move {
            let details = self.api.load_game(&id).await?;
            Ok::<_, ClientError>(SavedSessionSummary::from_details(id, &details))
        });

        try_join_all(fetches).await
    }

    /// Asks the server to delete sessions older than `days` days.
    pub async fn cleanup_sessions(&self, days: u32) -> ClientResult<CleanupReport> {
        if days < 1 {
            return Err(ClientError::Game(
                "Days parameter must be at least 1".to_string(),
            ));
        }
        self.api.cleanup_sessions(days).await
    }
}

impl SessionClient<HttpGameApi> {
    pub fn connect(base_url: &str) -> Self {
        Self::new(HttpGameApi::new(base_url))
    }
}
