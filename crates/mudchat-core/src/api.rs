//! Wire types and the HTTP client for the game server.
//!
//! The server is loose about its payloads: any field may be missing, and
//! `game_state` carries whatever the game engine keeps. Every response type
//! here therefore defaults each field and keeps unknown keys around.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Game engine state attached to a turn. Only `theme` is relied upon;
/// the rest is kept as-is in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameState {
    pub fn room(&self) -> Option<&str> {
        self.extra.get("room").and_then(Value::as_str)
    }

    pub fn inventory(&self) -> Vec<&str> {
        self.extra
            .get("inventory")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn score(&self) -> Option<i64> {
        self.extra.get("score").and_then(Value::as_i64)
    }

    /// Creation time, accepting RFC 3339 as well as the offset-less ISO
    /// timestamps the server writes (read as UTC).
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.extra.get("created_at").and_then(Value::as_str)?;
        parse_timestamp(raw)
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Response to new game, send command and load game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameTurnResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GameState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GameTurnResult {
    /// Result handed back without a round trip when there is nothing to send to.
    pub fn no_active_session() -> Self {
        Self {
            message: "You need to start a new game first.".to_string(),
            success: Some(false),
            error: Some("No active session".to_string()),
            ..Self::default()
        }
    }

    pub fn theme(&self) -> Option<&str> {
        self.game_state.as_ref().and_then(|s| s.theme.as_deref())
    }

    /// Whether the body itself reports a failure.
    pub fn is_failure(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty()) || self.success == Some(false)
    }

    /// Turns a body that reports a failure into `ClientError::Game`.
    pub fn into_outcome(self) -> ClientResult<Self> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(ClientError::Game(error.to_string()));
        }
        if self.success == Some(false) {
            let reason = if self.message.is_empty() {
                "Request failed".to_string()
            } else {
                self.message
            };
            return Err(ClientError::Game(reason));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize)]
struct NewGameRequest<'a> {
    theme: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRequest {
    pub message: String,
    pub session_id: String,
    pub theme: String,
}

/// The listing endpoint has returned both bare ids and session objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum SessionEntry {
    Id(String),
    Info { id: String },
}

impl SessionEntry {
    fn into_id(self) -> String {
        match self {
            SessionEntry::Id(id) | SessionEntry::Info { id } => id,
        }
    }
}

#[derive(Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CleanupReport {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default)]
    pub removed_count: Option<u64>,
    #[serde(default)]
    pub remaining_count: Option<u64>,
}

/// The remote operations the session client depends on.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn new_game(&self, theme: &str) -> ClientResult<GameTurnResult>;

    async fn send_message(&self, request: &MessageRequest) -> ClientResult<GameTurnResult>;

    async fn load_game(&self, session_id: &str) -> ClientResult<GameTurnResult>;

    /// Fails with `ClientError::Status` on a non-2xx response.
    async fn list_sessions(&self) -> ClientResult<Vec<String>>;

    async fn cleanup_sessions(&self, days: u32) -> ClientResult<CleanupReport>;
}

#[derive(Clone)]
pub struct HttpGameApi {
    client: Client,
    base_url: String,
}

impl HttpGameApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for HttpGameApi {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn new_game(&self, theme: &str) -> ClientResult<GameTurnResult> {
        let url = self.endpoint(&["api", "game", "new"])?;
        debug!(%url, theme, "starting new game");

        let response = self
            .client
            .post(url)
            .json(&NewGameRequest { theme })
            .send()
            .await?;

        Ok(response.json().await?)
    }

    async fn send_message(&self, request: &MessageRequest) -> ClientResult<GameTurnResult> {
        let url = self.endpoint(&["api", "game", "message"])?;
        debug!(%url, session_id = %request.session_id, "sending command");

        let response = self.client.post(url).json(request).send().await?;

        Ok(response.json().await?)
    }

    async fn load_game(&self, session_id: &str) -> ClientResult<GameTurnResult> {
        let url = self.endpoint(&["api", "game", "load", session_id])?;
        debug!(%url, "loading game");

        let response = self.client.get(url).send().await?;

        Ok(response.json().await?)
    }

    async fn list_sessions(&self) -> ClientResult<Vec<String>> {
        let url = self.endpoint(&["api", "game", "sessions"])?;
        debug!(%url, "listing sessions");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let sessions: SessionsResponse = response.json().await?;
        Ok(sessions
            .sessions
            .into_iter()
            .map(SessionEntry::into_id)
            .collect())
    }

    async fn cleanup_sessions(&self, days: u32) -> ClientResult<CleanupReport> {
        let url = self.endpoint(&["api", "game", "cleanup"])?;
        debug!(%url, days, "cleaning up sessions");

        let response = self
            .client
            .post(url)
            .query(&[("days", days)])
            .send()
            .await?;

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turn_result_tolerates_missing_fields() {
        let result: GameTurnResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(result.message, "");
        assert!(result.session_id.is_none());
        assert!(result.game_state.is_none());
        assert!(!result.is_failure());
    }

    #[test]
    fn test_turn_result_null_message_becomes_empty() {
        let result: GameTurnResult =
            serde_json::from_value(json!({"message": null, "session_id": "abc123"})).unwrap();
        assert_eq!(result.message, "");
        assert_eq!(result.session_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_game_state_keeps_unknown_fields() {
        let result: GameTurnResult = serde_json::from_value(json!({
            "message": "You enter a cafe.",
            "session_id": "abc123",
            "game_state": {
                "theme": "cafe",
                "room": "entrance",
                "inventory": ["menu", "coin"],
                "score": 3,
                "vocabulary": {"コーヒー": true}
            }
        }))
        .unwrap();

        let state = result.game_state.as_ref().unwrap();
        assert_eq!(result.theme(), Some("cafe"));
        assert_eq!(state.room(), Some("entrance"));
        assert_eq!(state.inventory(), vec!["menu", "coin"]);
        assert_eq!(state.score(), Some(3));
        assert!(state.extra.contains_key("vocabulary"));
    }

    #[test]
    fn test_created_at_accepts_naive_iso() {
        let state: GameState =
            serde_json::from_value(json!({"created_at": "2025-03-01T12:30:00.123456"})).unwrap();
        let created = state.created_at().unwrap();
        assert_eq!(created.to_rfc3339(), "2025-03-01T12:30:00.123456+00:00");
    }

    #[test]
    fn test_created_at_accepts_rfc3339() {
        let state: GameState =
            serde_json::from_value(json!({"created_at": "2025-03-01T12:30:00+02:00"})).unwrap();
        assert_eq!(
            state.created_at().unwrap().to_rfc3339(),
            "2025-03-01T10:30:00+00:00"
        );
    }

    #[test]
    fn test_into_outcome_maps_error_field() {
        let result = GameTurnResult {
            message: "ignored".to_string(),
            error: Some("bad command".to_string()),
            ..GameTurnResult::default()
        };
        match result.into_outcome() {
            Err(ClientError::Game(msg)) => assert_eq!(msg, "bad command"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_into_outcome_maps_unsuccessful_body() {
        let result = GameTurnResult {
            message: "Game session nope not found".to_string(),
            success: Some(false),
            ..GameTurnResult::default()
        };
        match result.into_outcome() {
            Err(ClientError::Game(msg)) => assert_eq!(msg, "Game session nope not found"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_session_listing_accepts_ids_and_objects() {
        let listing: SessionsResponse = serde_json::from_value(json!({
            "sessions": ["s1", {"id": "s2", "theme": "gym", "created_at": null}]
        }))
        .unwrap();
        let ids: Vec<String> = listing.sessions.into_iter().map(SessionEntry::into_id).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_endpoint_joins_onto_base_path() {
        let api = HttpGameApi::new("http://localhost:8000/");
        assert_eq!(
            api.endpoint(&["api", "game", "new"]).unwrap().as_str(),
            "http://localhost:8000/api/game/new"
        );

        let prefixed = HttpGameApi::new("http://example.com/mud/");
        assert_eq!(
            prefixed.endpoint(&["api", "game", "sessions"]).unwrap().as_str(),
            "http://example.com/mud/api/game/sessions"
        );
    }

    #[test]
    fn test_endpoint_encodes_session_id() {
        let api = HttpGameApi::default();
        let url = api.endpoint(&["api", "game", "load", "../cleanup?days=1#x"]).unwrap();
        assert_eq!(url.path(), "/api/game/load/..%2Fcleanup%3Fdays=1%23x");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_endpoint_rejects_unparsable_base() {
        let api = HttpGameApi::new("localhost:8000");
        match api.endpoint(&["api"]) {
            Err(err @ ClientError::InvalidUrl(_)) => assert!(err.is_transport()),
            other => panic!("unexpected endpoint: {:?}", other),
        }
    }
}
