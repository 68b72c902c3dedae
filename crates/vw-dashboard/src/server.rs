use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use axum::{http::StatusCode, Json};
use regex::Regex;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::sink::{ChannelDashboardSink, Event};
use crate::types::{ChainStatus, LogMessage};

/// Caps the retained log history at the same length the original Go
/// dashboard keeps in memory (`td2/dashboard/server.go` `logLength`).
const LOG_CACHE_LEN: usize = 256;

struct Shared {
    status: RwLock<HashMap<String, ChainStatus>>,
    logs: RwLock<VecDeque<LogMessage>>,
    hide_logs: bool,
    leak_pattern: Regex,
    updates: broadcast::Sender<Vec<u8>>,
}

#[derive(Clone)]
struct AppState(Arc<Shared>);

/// Starts the dashboard's background event-drain task and HTTP/websocket
/// server, returning the `DashboardSink` handed to chain monitors and the
/// `JoinHandle` for the combined background work.
pub fn spawn(
    addr: SocketAddr,
    hide_logs: bool,
    shutdown: CancellationToken,
) -> (ChannelDashboardSink, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (updates, _rx0) = broadcast::channel(128);

    let shared = Arc::new(Shared {
        status: RwLock::new(HashMap::new()),
        logs: RwLock::new(VecDeque::with_capacity(LOG_CACHE_LEN)),
        hide_logs,
        // Matches the original's best-effort scheme://host leak redaction.
        leak_pattern: Regex::new(r"\W(https?|tcp|wss?)://\S+").expect("static regex"),
        updates,
    });

    let handle = tokio::spawn(run(shared.clone(), addr, rx, shutdown));
    (ChannelDashboardSink::new(tx), handle)
}

async fn run(
    shared: Arc<Shared>,
    addr: SocketAddr,
    mut events: mpsc::UnboundedReceiver<Event>,
    shutdown: CancellationToken,
) {
    let state = AppState(shared.clone());
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/logsenabled", get(logs_enabled_handler))
        .route("/logs", get(logs_handler))
        .route("/state", get(state_handler))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target = "dashboard", error = %e, %addr, "failed to bind dashboard http server");
            return;
        }
    };
    tracing::info!(target = "dashboard", addr = %listener.local_addr().unwrap(), "listening");

    let shutdown_for_serve = shutdown.clone();
    let serve = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown_for_serve.cancelled().await });

    tokio::select! {
        res = serve => {
            if let Err(e) = res {
                tracing::error!(target = "dashboard", error = %e, "server error");
            }
        }
        _ = drain_events(shared, &mut events, shutdown.clone()) => {}
    }
}

async fn drain_events(
    shared: Arc<Shared>,
    events: &mut mpsc::UnboundedReceiver<Event>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            maybe = events.recv() => {
                let Some(event) = maybe else { return };
                match event {
                    Event::Snapshot(snapshot) => {
                        let mut status: ChainStatus = snapshot.into();
                        if shared.hide_logs && shared.leak_pattern.is_match(&status.last_error) {
                            status.last_error = shared
                                .leak_pattern
                                .replace_all(&status.last_error, " -redacted-")
                                .into_owned();
                        }
                        let name = status.name.clone();
                        let mut map = shared.status.write().await;
                        map.insert(name, status);
                        let snapshot_list: Vec<&ChainStatus> = map.values().collect();
                        if let Ok(bytes) = serde_json::to_vec(&snapshot_list) {
                            let _ = shared.updates.send(bytes);
                        }
                    }
                    Event::Log(line) => {
                        if shared.hide_logs {
                            continue;
                        }
                        let mut logs = shared.logs.write().await;
                        if logs.len() >= LOG_CACHE_LEN {
                            logs.pop_back();
                        }
                        logs.push_front(line.clone());
                        if let Ok(bytes) = serde_json::to_vec(&line) {
                            let _ = shared.updates.send(bytes);
                        }
                    }
                }
            }
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut rx = state.0.updates.subscribe();
    loop {
        match rx.recv().await {
            Ok(bytes) => {
                if socket.send(Message::Text(String::from_utf8_lossy(&bytes).into_owned())).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn logs_enabled_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "enabled": !state.0.hide_logs }))
}

async fn logs_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.0.hide_logs {
        return (StatusCode::OK, Json(Vec::<LogMessage>::new()));
    }
    let logs = state.0.logs.read().await;
    (StatusCode::OK, Json(logs.iter().cloned().collect::<Vec<_>>()))
}

async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.0.status.read().await;
    Json(status.values().cloned().collect::<Vec<_>>())
}
