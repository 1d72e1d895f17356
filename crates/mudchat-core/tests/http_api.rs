//! Integration tests for the HTTP game client
//!
//! Each test runs a throwaway HTTP/1.1 server on a local port and checks
//! the requests the client makes and how it reads the replies.

use std::sync::{Arc, Mutex};

use mudchat_core::{ClientError, SessionClient, Theme};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    body: String,
}

impl Recorded {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

type Seen = Arc<Mutex<Vec<Recorded>>>;

async fn spawn_server<F>(route: F) -> (String, Seen)
where
    F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let route = Arc::new(route);

    let seen_server = seen.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let route = route.clone();
            let seen = seen_server.clone();
            tokio::spawn(async move {
                handle(stream, route, seen).await;
            });
        }
    });

    (format!("http://{}", addr), seen)
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn handle<F>(mut stream: TcpStream, route: Arc<F>, seen: Seen)
where
    F: Fn(&str, &str) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let (status, payload) = route(&method, &path);
    seen.lock().unwrap().push(Recorded { method, path, body });

    let reason = if status == 200 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        payload.len(),
        payload
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    let _ = stream.shutdown().await;
}

fn seen_paths(seen: &Seen) -> Vec<String> {
    seen.lock().unwrap().iter().map(|r| r.path.clone()).collect()
}

#[tokio::test]
async fn test_new_game_then_command() {
    let (base_url, seen) = spawn_server(|_, path| match path {
        "/api/game/new" => (
            200,
            json!({"message": "You enter a cafe.", "session_id": "abc123", "game_state": {"theme": "cafe", "room": "entrance"}}).to_string(),
        ),
        "/api/game/message" => (
            200,
            json!({"message": "You see a counter.", "session_id": "abc123"}).to_string(),
        ),
        _ => (404, json!({"detail": "Not Found"}).to_string()),
    })
    .await;

    let mut client = SessionClient::connect(&base_url);

    let opening = client.start_game(Theme::Cafe).await.unwrap();
    assert_eq!(opening.message, "You enter a cafe.");
    assert_eq!(opening.theme(), Some("cafe"));
    assert_eq!(client.current_session_id(), Some("abc123"));

    let reply = client.send_command("look around", Theme::Cafe).await.unwrap();
    assert_eq!(reply.message, "You see a counter.");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].json(), json!({"theme": "cafe"}));
    assert_eq!(requests[1].path, "/api/game/message");
    assert_eq!(
        requests[1].json(),
        json!({"message": "look around", "session_id": "abc123", "theme": "cafe"})
    );
}

#[tokio::test]
async fn test_load_reads_body_regardless_of_status() {
    let (base_url, seen) = spawn_server(|_, _| {
        (
            404,
            json!({"success": false, "message": "Game session gone not found"}).to_string(),
        )
    })
    .await;

    let mut client = SessionClient::connect(&base_url);
    let result = client.load_game("gone").await.unwrap();

    assert!(result.is_failure());
    assert_eq!(result.message, "Game session gone not found");
    assert_eq!(client.current_session_id(), None);
    assert_eq!(seen_paths(&seen), vec!["/api/game/load/gone"]);
    assert_eq!(seen.lock().unwrap()[0].method, "GET");
}

#[tokio::test]
async fn test_load_keeps_session_id_in_one_segment() {
    let (base_url, seen) = spawn_server(|_, _| {
        (
            200,
            json!({"message": "Back at the counter.", "session_id": "a/b?c"}).to_string(),
        )
    })
    .await;

    let mut client = SessionClient::connect(&base_url);
    client.load_game("a/b?c").await.unwrap();

    assert_eq!(seen_paths(&seen), vec!["/api/game/load/a%2Fb%3Fc"]);
    assert_eq!(client.current_session_id(), Some("a/b?c"));
}

#[tokio::test]
async fn test_listing_non_success_status_is_error() {
    let (base_url, _seen) =
        spawn_server(|_, _| (500, json!({"detail": "boom"}).to_string())).await;

    let client = SessionClient::connect(&base_url);
    match client.list_session_ids().await {
        Err(ClientError::Status(status)) => assert_eq!(status.as_u16(), 500),
        other => panic!("unexpected listing result: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_transport_error() {
    let (base_url, _seen) = spawn_server(|_, _| (200, "not json".to_string())).await;

    let mut client = SessionClient::connect(&base_url);
    let err = client.start_game(Theme::Gym).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(client.current_session_id(), None);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = SessionClient::connect(&format!("http://{}", addr));
    let err = client.load_game("s1").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_saved_sessions_over_http() {
    let (base_url, seen) = spawn_server(|_, path| match path {
        "/api/game/sessions" => (
            200,
            json!({"sessions": [
                {"id": "s1", "theme": "office", "created_at": "2025-02-03T04:05:06"},
                "s2"
            ]})
            .to_string(),
        ),
        "/api/game/load/s1" => (
            200,
            json!({"success": true, "message": "loaded", "session_id": "s1", "game_state": {"theme": "office"}}).to_string(),
        ),
        "/api/game/load/s2" => (
            200,
            json!({"success": true, "message": "loaded", "session_id": "s2", "game_state": {"theme": "gym"}}).to_string(),
        ),
        _ => (404, "{}".to_string()),
    })
    .await;

    let client = SessionClient::connect(&base_url);
    let saved = client.list_saved_sessions().await.unwrap();

    let summary: Vec<(&str, &str)> = saved
        .iter()
        .map(|s| (s.id.as_str(), s.theme.as_str()))
        .collect();
    assert_eq!(summary, vec![("s1", "office"), ("s2", "gym")]);
    assert_eq!(client.current_session_id(), None);

    let mut paths = seen_paths(&seen);
    paths.sort();
    assert_eq!(
        paths,
        vec!["/api/game/load/s1", "/api/game/load/s2", "/api/game/sessions"]
    );
}

#[tokio::test]
async fn test_cleanup_sends_days_query() {
    let (base_url, seen) = spawn_server(|_, _| {
        (
            200,
            json!({"success": true, "message": "Cleaned up sessions older than 3 days", "removed_count": 2, "remaining_count": 5}).to_string(),
        )
    })
    .await;

    let client = SessionClient::connect(&base_url);
    let report = client.cleanup_sessions(3).await.unwrap();

    assert_eq!(report.removed_count, Some(2));
    assert_eq!(report.remaining_count, Some(5));
    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/game/cleanup?days=3");
}
