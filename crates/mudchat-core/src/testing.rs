//! Testing utilities.
//!
//! `MockGameApi` stands in for the game server: replies are scripted up
//! front and every call is recorded so tests can assert on what was (and
//! was not) sent.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::api::{CleanupReport, GameApi, GameState, GameTurnResult, MessageRequest};
use crate::error::{ClientError, ClientResult};

/// A scripted reply. `Err` is delivered as `ClientError::Status`, which
/// counts as a transport failure.
pub type MockReply = Result<GameTurnResult, StatusCode>;

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NewGame(String),
    SendMessage(MessageRequest),
    LoadGame(String),
    ListSessions,
    Cleanup(u32),
}

pub struct MockGameApi {
    new_game: Mutex<VecDeque<MockReply>>,
    messages: Mutex<VecDeque<MockReply>>,
    loads: Mutex<HashMap<String, MockReply>>,
    sessions: Mutex<Result<Vec<String>, StatusCode>>,
    calls: Mutex<Vec<Call>>,
}

impl Default for MockGameApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGameApi {
    pub fn new() -> Self {
        Self {
            new_game: Mutex::new(VecDeque::new()),
            messages: Mutex::new(VecDeque::new()),
            loads: Mutex::new(HashMap::new()),
            sessions: Mutex::new(Ok(Vec::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the reply for the next new game request.
    pub fn on_new_game(self, reply: MockReply) -> Self {
        self.new_game.lock().unwrap().push_back(reply);
        self
    }

    /// Queue the reply for the next command.
    pub fn on_message(self, reply: MockReply) -> Self {
        self.messages.lock().unwrap().push_back(reply);
        self
    }

    /// Reply used for every load of `session_id`.
    pub fn on_load(self, session_id: &str, reply: MockReply) -> Self {
        self.loads
            .lock()
            .unwrap()
            .insert(session_id.to_string(), reply);
        self
    }

    pub fn on_list(self, reply: Result<Vec<String>, StatusCode>) -> Self {
        *self.sessions.lock().unwrap() = reply;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn deliver(reply: Option<MockReply>) -> ClientResult<GameTurnResult> {
    match reply {
        Some(Ok(result)) => Ok(result),
        Some(Err(status)) => Err(ClientError::Status(status)),
        None => Err(ClientError::Status(StatusCode::SERVICE_UNAVAILABLE)),
    }
}

#[async_trait]
impl GameApi for MockGameApi {
    async fn new_game(&self, theme: &str) -> ClientResult<GameTurnResult> {
        self.record(Call::NewGame(theme.to_string()));
        deliver(self.new_game.lock().unwrap().pop_front())
    }

    async fn send_message(&self, request: &MessageRequest) -> ClientResult<GameTurnResult> {
        self.record(Call::SendMessage(request.clone()));
        deliver(self.messages.lock().unwrap().pop_front())
    }

    async fn load_game(&self, session_id: &str) -> ClientResult<GameTurnResult> {
        self.record(Call::LoadGame(session_id.to_string()));
        let reply = self.loads.lock().unwrap().get(session_id).cloned();
        match reply {
            Some(reply) => deliver(Some(reply)),
            None => Err(ClientError::Status(StatusCode::NOT_FOUND)),
        }
    }

    async fn list_sessions(&self) -> ClientResult<Vec<String>> {
        self.record(Call::ListSessions);
        self.sessions
            .lock()
            .unwrap()
            .clone()
            .map_err(ClientError::Status)
    }

    async fn cleanup_sessions(&self, days: u32) -> ClientResult<CleanupReport> {
        self.record(Call::Cleanup(days));
        Ok(CleanupReport {
            success: Some(true),
            message: format!("Cleaned up sessions older than {} days", days),
            removed_count: Some(0),
            remaining_count: Some(0),
        })
    }
}

/// A successful turn reply.
pub fn turn(message: &str, session_id: &str) -> GameTurnResult {
    GameTurnResult {
        message: message.to_string(),
        session_id: Some(session_id.to_string()),
        ..GameTurnResult::default()
    }
}

/// A successful turn reply carrying a game state with the given theme.
pub fn themed_turn(message: &str, session_id: &str, theme: &str) -> GameTurnResult {
    GameTurnResult {
        game_state: Some(GameState {
            theme: Some(theme.to_string()),
            ..GameState::default()
        }),
        ..turn(message, session_id)
    }
}
