//! WebSocket upgrade into the realtime engine.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chatter_realtime::signal::{ClientSignal, ServerSignal};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// GET /ws?token={jwt}
///
/// The token guards the upgrade; presence registration still requires the
/// client to send its join signal afterwards.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let claims = state.jwt_decoder.decode_token(&query.token)?;
    let user_id = claims.user_id();

    Ok(ws.on_upgrade(move |socket| handle_connection(state, user_id, socket)))
}

/// Drives one established WebSocket connection.
async fn handle_connection(state: AppState, user_id: Uuid, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut outbound_rx) = state.engine.connect();
    let conn_id = handle.id;

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection established");

    // Forward queued server signals out to the socket as JSON text. The
    // queue ending means the engine closed this connection (for example a
    // duplicate join superseded it), so finish with a close frame.
    let mut outbound_task = tokio::spawn(async move {
        while let Some(signal) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&signal) {
                Ok(json) => json,
                Err(err) => {
                    warn!(conn_id = %conn_id, error = %err, "failed to serialize signal");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Inbound signals are processed sequentially, preserving per-connection
    // order. The loop also ends when the forwarder does, so an
    // engine-initiated close tears down the read half rather than leaving
    // it running until the client goes away.
    loop {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientSignal>(text.as_str()) {
                        Ok(signal) => state.engine.handle_signal(&handle, signal).await,
                        Err(err) => {
                            debug!(conn_id = %conn_id, error = %err, "unparseable client signal");
                            handle.send(ServerSignal::Error {
                                code: "BAD_SIGNAL".to_string(),
                                message: "Could not parse signal".to_string(),
                            });
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(conn_id = %conn_id, error = %err, "WebSocket error");
                    break;
                }
            },
            _ = &mut outbound_task => {
                debug!(conn_id = %conn_id, "outbound queue closed, dropping connection");
                break;
            }
        }
    }

    state.engine.disconnect(conn_id).await;
    outbound_task.abort();

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}
