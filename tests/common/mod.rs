//! In-process stand-in for the tournament service: the REST endpoints under
//! `/api/tournament` and the push hub at `/hubs/tournament`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashboard_client::{ClientConfig, Session, SessionHandle};
use dashboard_core::TournamentState;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};

struct Inner {
    snapshot: Mutex<Value>,
    rejections: Mutex<HashMap<String, (StatusCode, Option<Value>)>>,
    commands: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    hub: broadcast::Sender<String>,
}

#[derive(Clone)]
pub struct FakeService {
    inner: Arc<Inner>,
    pub base_url: String,
}

impl FakeService {
    pub async fn start(snapshot: Value) -> Self {
        let (hub, _) = broadcast::channel(64);
        let inner = Arc::new(Inner {
            snapshot: Mutex::new(snapshot),
            rejections: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            hub,
        });

        let app = Router::new()
            .route("/api/tournament/state", get(state_handler))
            .route("/api/tournament/{command}", post(command_handler))
            .route("/hubs/tournament", get(hub_handler))
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake service");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake service crashed");
        });

        Self {
            inner,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_service(&self.base_url)
    }

    /// Spawns a real session (HTTP + WebSocket) pointed at this service.
    pub fn session(&self) -> SessionHandle {
        let session = Session::from_config(&self.config()).expect("Failed to build session");
        SessionHandle::spawn(session)
    }

    pub fn set_snapshot(&self, snapshot: Value) {
        *self.inner.snapshot.lock().unwrap() = snapshot;
    }

    /// Makes `POST /{command}` fail with `status` and an optional JSON body.
    pub fn reject(&self, command: &str, status: StatusCode, body: Option<Value>) {
        self.inner
            .rejections
            .lock()
            .unwrap()
            .insert(command.to_string(), (status, body));
    }

    /// Sends a frame to every connected hub client; returns how many got it.
    pub fn push(&self, frame: impl Into<String>) -> usize {
        self.inner.hub.send(frame.into()).unwrap_or(0)
    }

    pub fn fetches(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.inner.commands.lock().unwrap().clone()
    }
}

async fn state_handler(State(inner): State<Arc<Inner>>) -> Json<Value> {
    inner.fetches.fetch_add(1, Ordering::SeqCst);
    Json(inner.snapshot.lock().unwrap().clone())
}

async fn command_handler(
    State(inner): State<Arc<Inner>>,
    Path(command): Path<String>,
) -> Response {
    inner.commands.lock().unwrap().push(command.clone());

    if let Some((status, body)) = inner.rejections.lock().unwrap().get(&command).cloned() {
        return match body {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        };
    }

    let status = match command.as_str() {
        "start" | "resume" => "running",
        "pause" => "paused",
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    inner.snapshot.lock().unwrap()["status"] = json!(status);
    Json(json!({ "success": true })).into_response()
}

async fn hub_handler(ws: WebSocketUpgrade, State(inner): State<Arc<Inner>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| hub_socket(socket, inner))
}

async fn hub_socket(socket: WebSocket, inner: Arc<Inner>) {
    let (mut sender, mut receiver) = socket.split();
    let mut frames = inner.hub.subscribe();

    // Handshake: one JSON record naming the protocol.
    match receiver.next().await {
        Some(Ok(Message::Text(t))) if t.as_str().contains("\"protocol\":\"json\"") => {}
        _ => return,
    }
    if sender.send(Message::Text("{}\u{1e}".into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            },
        }
    }
}

pub fn running_snapshot() -> Value {
    json!({
        "status": 1,
        "completedGames": 3,
        "totalGames": 12,
        "progressPercent": 25.0,
        "bots": [
            { "name": "Minimax", "difficulty": "medium", "elo": 590.0, "wins": 1, "losses": 2 },
            { "name": "Grandmaster", "difficulty": 10, "elo": 655.5, "wins": 3 },
            { "name": "Rookie", "difficulty": 1, "elo": 600.0 }
        ],
        "matchHistory": [
            {
                "winner": "red", "loser": "blue", "totalMoves": 41, "durationMs": 95000,
                "winnerDifficulty": 10, "loserDifficulty": 1, "isDraw": false,
                "winnerBotName": "Grandmaster", "loserBotName": "Rookie"
            }
        ],
        "currentMatch": null,
        "startTimeUtc": "2024-05-01T12:00:00Z",
        "endTimeUtc": null
    })
}

/// Waits until the watched state satisfies `pred`, failing after five seconds.
pub async fn wait_for(
    rx: &mut watch::Receiver<TournamentState>,
    pred: impl FnMut(&TournamentState) -> bool,
) -> TournamentState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("Timed out waiting for state")
        .expect("Session stopped")
        .clone()
}
