//! Manages the media-stream WebSocket connection lifecycle for one call.

use crate::{state::AppState, ws::agent};
use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use switchboard_bridge::{MediaSink, MediaStreamBridge, OutboundMessage, SinkError};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a media-stream WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Serializes bridge messages onto the Twilio-facing WebSocket.
struct WsMediaSink {
    socket_tx: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl MediaSink for WsMediaSink {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
        let text = serde_json::to_string(&message).map_err(|e| SinkError::new(e.to_string()))?;
        self.socket_tx
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SinkError::new(e.to_string()))
    }
}

/// Main handler for an individual media-stream connection.
///
/// Builds the audio bridge over this socket, brackets the agent session
/// around it, and then drives the receive loop until Twilio disconnects.
#[instrument(name = "media_stream", skip_all, fields(call_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let call_id = Uuid::new_v4();
    tracing::Span::current().record("call_id", tracing::field::display(call_id));
    info!("Media stream connected. Starting agent session...");
    state.active_calls.fetch_add(1, Ordering::Relaxed);

    let (socket_tx, mut socket_rx) = socket.split();
    let sink = Arc::new(WsMediaSink {
        socket_tx: Mutex::new(socket_tx),
    });
    let bridge = Arc::new(MediaStreamBridge::new(sink, state.config.bridge_config()));

    let agent_session = agent::start_session(&state, bridge.clone());

    while let Some(frame) = socket_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => bridge.handle_message(&text),
            Ok(Message::Close(_)) => {
                info!("Twilio closed the media stream.");
                break;
            }
            Ok(Message::Binary(_)) => warn!("Ignoring unexpected binary frame on media stream."),
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!(error = %e, "Error receiving from media stream");
                break;
            }
        }
    }

    agent_session.shutdown();
    bridge.stop().await;
    state.active_calls.fetch_sub(1, Ordering::Relaxed);
    info!("Media stream session finished.");
}
