//! HTTP/WebSocket surface.
//!
//! `GET /ws` upgrades to the push transport; everything else is the page
//! surface: a `www` directory when one is present, otherwise an embedded
//! fallback page with the input-box and background placeholders replaced.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::{Html, Response};
use axum::routing::get;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use crate::broadcast::Broadcaster;
use crate::input::InputEcho;

const INDEX_HTML: &str = include_str!("assets/index.html");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Live subscriber registry fed by the pipe supervisor.
    pub broadcaster: Broadcaster,
    /// Reverse-path target; `None` hides the input box and drops inbound
    /// messages.
    pub input: Option<Arc<InputEcho>>,
    /// Background image URL injected into the fallback page, never
    /// interpreted server-side.
    pub background_url: String,
}

/// Build the router. When `www_dir` is set, static files win over the
/// embedded page (the original serves an `index.html` from there).
pub fn build_router(state: AppState, www_dir: Option<PathBuf>) -> Router {
    let router = Router::new().route("/ws", get(ws_upgrade));
    let router = match www_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(index_page),
    };
    router.with_state(state)
}

/// Serve the embedded page with its placeholders substituted.
async fn index_page(State(state): State<AppState>) -> Html<String> {
    let input_box = if state.input.is_some() { "true" } else { "false" };
    let page = INDEX_HTML
        .replace("INPUT_BOX_PLACEHOLDER", input_box)
        .replace("BACKGROUND_URL_PLACEHOLDER", &state.background_url);
    Html(page)
}

/// `GET /ws` — subscriber join.
async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one subscriber: fan-out queue → socket, inbound text → input echo.
/// The subscriber leaves the registry on any exit path.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (id, mut queue) = state.broadcaster.subscribe().await;
    info!(subscriber_id = id, "WebSocket connected");

    loop {
        tokio::select! {
            outbound = queue.recv() => {
                let Some(text) = outbound else { break };
                if socket.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        forward_input(&state, text.as_str()).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(subscriber_id = id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    state.broadcaster.unsubscribe(id).await;
    info!(subscriber_id = id, "WebSocket disconnected");
}

/// Append one inbound message to the input target, if one is configured.
/// Write failures are logged and the connection stays up.
async fn forward_input(state: &AppState, text: &str) {
    let Some(input) = &state.input else { return };
    if let Err(e) = input.write_line(text).await {
        error!(
            input = %input.description(),
            error = %e,
            "Error in transmitting input to pipe"
        );
    }
}
