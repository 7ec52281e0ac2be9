//! Manages the per-call connection to the conversational agent.
//!
//! The bridge's inbound handler feeds decoded caller audio into a bounded
//! channel; one background task per call drains it and speaks the ElevenLabs
//! Conversational AI protocol, pushing the agent's voice back through the
//! bridge.

pub mod elevenlabs;

use crate::state::AppState;
use bytes::Bytes;
use std::sync::Arc;
use switchboard_bridge::MediaStreamBridge;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, warn};

/// Handle to a running agent session. Dropping it does not stop the task;
/// call [`shutdown`](Self::shutdown) when the call ends.
pub struct AgentSession {
    task: JoinHandle<()>,
}

impl AgentSession {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Starts the agent session for one call: registers the bridge's inbound
/// handler and spawns the connector task.
///
/// The handler runs on the transport's receive path, so it hands audio to
/// the connector with `try_send`; if the connector falls behind, caller
/// audio is dropped rather than stalling the receive loop. A connector
/// failure ends the agent session but never the call — the media stream
/// keeps being served until Twilio disconnects.
pub fn start_session(state: &Arc<AppState>, bridge: Arc<MediaStreamBridge>) -> AgentSession {
    let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(128);

    bridge.start(Box::new(move |audio| {
        if audio_tx.try_send(audio).is_err() {
            warn!("agent audio channel full; dropping caller audio frame");
        }
    }));

    let config = state.config.clone();
    let task = tokio::spawn(async move {
        if let Err(e) = elevenlabs::run(&config, audio_rx, bridge).await {
            error!(error = ?e, "Conversational agent session failed");
        }
    });

    AgentSession { task }
}
