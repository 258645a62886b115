use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::{adapters::http::app_state::AppState, application::realtime::SessionHub};

#[derive(Debug, Default, Deserialize)]
pub struct HandshakeParams {
    token: Option<String>,
}

/// GET /notifications
/// Authentication happens after the upgrade so a rejected client still
/// receives the `error` event before the socket closes.
pub async fn notifications_ws(
    State(app_state): State<AppState>,
    Query(params): Query<HandshakeParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = handshake_token(params, &headers);
    let hub = app_state.session_hub.clone();
    ws.on_upgrade(move |socket| run_session(socket, hub, token))
}

/// `?token=` wins over the `Authorization` header.
fn handshake_token(params: HandshakeParams, headers: &HeaderMap) -> Option<String> {
    params.token.filter(|t| !t.trim().is_empty()).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.strip_prefix("Bearer").unwrap_or(v).trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

async fn run_session(socket: WebSocket, hub: Arc<SessionHub>, token: Option<String>) {
    let (conn_id, mut outbox) = hub.connect();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    if hub.authenticate(conn_id, token.as_deref()).is_err() {
        // Flush the error event, then close without ever joining a group.
        while let Ok(event) = outbox.try_recv() {
            if let Ok(text) = serde_json::to_string(&event) {
                let _ = ws_sender.send(Message::Text(text.into())).await;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
        hub.disconnect(conn_id);
        return;
    }

    // Drain the outbox into the socket until either side goes away.
    let send_task = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(error = %err, "Dropping unserializable event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => hub.handle_text(conn_id, text.as_str()),
            Message::Close(_) => break,
            _ => {}
        }
    }

    hub.disconnect(conn_id);
    send_task.abort();
}
