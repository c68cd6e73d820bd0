//! HTTP and WebSocket request handlers.

use super::AppState;
use crate::config;
use crate::db::{ProbeOutcome, Snapshot, Target};
use crate::notifier::Notifier;
use crate::uptime::{aggregate, Status, UptimeSummary};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

/// Header listing series left out of an incomplete snapshot.
pub const OMITTED_HEADER: &str = "x-snapshot-omitted";

/// Event name for a snapshot sent on request.
pub const SNAPSHOT_EVENT: &str = "snapshot";
/// Event name for a snapshot pushed after a new outcome.
pub const UPDATE_EVENT: &str = "update";

// ============================================================================
// Pull fallback
// ============================================================================

pub async fn handle_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = match state.notifier.snapshot() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Web: Failed to query snapshot: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error querying database").into_response();
        }
    };

    let mut headers = HeaderMap::new();
    if !snapshot.is_complete() {
        match HeaderValue::from_str(&snapshot.omitted.join(",")) {
            Ok(value) => {
                headers.insert(OMITTED_HEADER, value);
            }
            Err(e) => tracing::warn!("Web: Cannot encode omitted series header: {}", e),
        }
    }

    (headers, Json(snapshot.records)).into_response()
}

pub async fn handle_urls(State(state): State<AppState>) -> impl IntoResponse {
    match config::read_raw(&state.config.targets_path) {
        Ok(text) => text.into_response(),
        Err(e) => {
            tracing::warn!("Web: {}", e);
            (StatusCode::NOT_FOUND, "urls.cfg not found").into_response()
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// One target's rolling uptime, as shown on the status page.
#[derive(Debug, Serialize)]
pub struct TargetSummary {
    pub key: String,
    pub url: String,
    pub status: Status,
    pub label: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub summary: UptimeSummary,
}

/// Summarize every target, worst status first.
pub fn build_summaries<Tz: TimeZone>(
    targets: &[Target],
    snapshot: &Snapshot,
    now: &DateTime<Tz>,
) -> Vec<TargetSummary> {
    let mut summaries: Vec<TargetSummary> = targets
        .iter()
        .map(|target| {
            let summary = aggregate(&snapshot.history(&target.key), now);
            let status = summary.status();
            TargetSummary {
                key: target.key.clone(),
                url: target.url.clone(),
                status,
                label: status.label(),
                description: status.description(),
                summary,
            }
        })
        .collect();

    summaries.sort_by_key(|s| s.status.priority());
    summaries
}

pub async fn handle_summary(State(state): State<AppState>) -> impl IntoResponse {
    let targets = match config::load_targets(&state.config.targets_path) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Web: {}", e);
            return (StatusCode::NOT_FOUND, "urls.cfg not found").into_response();
        }
    };

    match state.notifier.snapshot() {
        Ok(snapshot) => Json(build_summaries(&targets, &snapshot, &Local::now())).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// Push subscription
// ============================================================================

#[derive(Serialize)]
struct PushEvent<'a> {
    event: &'a str,
    data: &'a [ProbeOutcome],
    omitted: &'a [String],
}

#[derive(Deserialize)]
struct ClientRequest {
    event: String,
}

/// Encode a snapshot as a push frame.
pub fn push_message(event: &str, snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PushEvent {
        event,
        data: &snapshot.records,
        omitted: &snapshot.omitted,
    })
}

/// Whether a client frame asks for the current snapshot.
///
/// Accepts the bare `requestUpdate` string or `{"event":"requestUpdate"}`.
pub fn is_update_request(text: &str) -> bool {
    let text = text.trim();
    text == "requestUpdate"
        || serde_json::from_str::<ClientRequest>(text)
            .map(|r| r.event == "requestUpdate")
            .unwrap_or(false)
}

pub async fn handle_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state.notifier))
}

async fn send_snapshot(socket: &mut WebSocket, event: &str, snapshot: &Snapshot) -> bool {
    let text = match push_message(event, snapshot) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Web: Failed to encode {} event: {}", event, e);
            return true;
        }
    };

    socket.send(Message::Text(text.into())).await.is_ok()
}

/// Serve one subscriber until it disconnects or a send fails.
async fn serve_subscriber(mut socket: WebSocket, notifier: Notifier) {
    let mut updates = notifier.subscribe();
    tracing::info!("Web: Client connected ({} subscribers)", notifier.subscriber_count());

    loop {
        tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) if is_update_request(text.as_str()) => {
                    let snapshot = match notifier.snapshot() {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::error!("Web: Failed to query snapshot: {}", e);
                            continue;
                        }
                    };
                    if !send_snapshot(&mut socket, SNAPSHOT_EVENT, &snapshot).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    if !send_snapshot(&mut socket, UPDATE_EVENT, &snapshot).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Web: Subscriber lagging, skipped {} updates", n);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Web: Client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::db::{MemoryStore, Outcome, ResultStore};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn state(dir: &TempDir, store: Arc<MemoryStore>) -> AppState {
        let config = ServerConfig {
            targets_path: dir.path().join("urls.cfg"),
            public_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        AppState {
            config,
            notifier: Notifier::new(store),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap()
    }

    fn record(store: &MemoryStore, key: &str, minutes_ago: i64, outcome: Outcome) {
        let ts = noon() - chrono::Duration::minutes(minutes_ago);
        store.append(&ProbeOutcome::new(key, ts, outcome)).unwrap();
    }

    #[test]
    fn test_is_update_request() {
        assert!(is_update_request("requestUpdate"));
        assert!(is_update_request(" requestUpdate\n"));
        assert!(is_update_request(r#"{"event":"requestUpdate"}"#));
        assert!(!is_update_request(r#"{"event":"other"}"#));
        assert!(!is_update_request("hello"));
    }

    #[test]
    fn test_push_message_shape() {
        let snapshot = Snapshot {
            records: vec![ProbeOutcome::new("a", noon(), Outcome::Success)],
            omitted: vec!["b".to_string()],
        };

        let value: serde_json::Value =
            serde_json::from_str(&push_message(UPDATE_EVENT, &snapshot).unwrap()).unwrap();

        assert_eq!(value["event"], "update");
        assert_eq!(value["data"][0]["key"], "a");
        assert_eq!(value["data"][0]["outcome"], "success");
        assert_eq!(value["omitted"][0], "b");
    }

    #[test]
    fn test_build_summaries_worst_first() {
        let store = MemoryStore::new();
        record(&store, "healthy", 1, Outcome::Success);
        record(&store, "down", 1, Outcome::Failure);
        record(&store, "flaky", 2, Outcome::Success);
        record(&store, "flaky", 1, Outcome::Failure);
        let targets = vec![
            Target::new("healthy", "http://healthy.example"),
            Target::new("unknown", "http://unknown.example"),
            Target::new("flaky", "http://flaky.example"),
            Target::new("down", "http://down.example"),
        ];

        let snapshot = store.query_all().unwrap();
        let summaries = build_summaries(&targets, &snapshot, &noon());
        let order: Vec<_> = summaries.iter().map(|s| (s.key.as_str(), s.status)).collect();

        // Sorting is stable: healthy stays ahead of unknown.
        assert_eq!(
            order,
            vec![
                ("down", Status::Failure),
                ("flaky", Status::Partial),
                ("healthy", Status::Success),
                ("unknown", Status::NoData),
            ]
        );
        assert_eq!(summaries[0].label, "Major Outage");
        assert_eq!(summaries[3].summary.uptime, "--%");
    }

    #[tokio::test]
    async fn test_handle_status_returns_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        record(&store, "a", 0, Outcome::Success);
        record(&store, "b", 0, Outcome::Failure);

        let response = handle_status(State(state(&dir, store.clone()))).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(OMITTED_HEADER).is_none());

        let expected = serde_json::to_value(store.query_all().unwrap().records).unwrap();
        assert_eq!(body_json(response).await, expected);
    }

    #[tokio::test]
    async fn test_handle_status_flags_omitted_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        record(&store, "a", 0, Outcome::Success);
        record(&store, "b", 0, Outcome::Success);
        store.break_series("b");

        let response = handle_status(State(state(&dir, store))).await.into_response();
        assert_eq!(response.headers()[OMITTED_HEADER], "b");
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_urls() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, Arc::new(MemoryStore::new()));

        let missing = handle_urls(State(state.clone())).await.into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        std::fs::write(&state.config.targets_path, "a=http://a.example\n").unwrap();
        let found = handle_urls(State(state)).await.into_response();
        assert_eq!(found.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(found.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"a=http://a.example\n");
    }

    #[tokio::test]
    async fn test_handle_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let state = state(&dir, store);
        std::fs::write(&state.config.targets_path, "a=http://a.example\n").unwrap();

        let response = handle_summary(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body[0]["key"], "a");
        assert_eq!(body[0]["status"], "nodata");
        assert_eq!(body[0]["uptime"], "--%");
        assert_eq!(body[0]["buckets"].as_array().unwrap().len(), 7);
    }
}
