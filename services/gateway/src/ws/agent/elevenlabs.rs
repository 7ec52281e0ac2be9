//! Handles the real-time WebSocket connection to ElevenLabs Conversational AI.

use crate::config::Config;
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use switchboard_bridge::MediaStreamBridge;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};
use tracing::{info, warn};

// --- Local ElevenLabs Conversational AI types (for encapsulation) ---
mod convai_types {
    use serde::{Deserialize, Serialize};

    /// One chunk of caller audio. This client message is identified by its
    /// single field rather than a `type` tag.
    #[derive(Serialize)]
    pub(super) struct UserAudioChunk {
        pub user_audio_chunk: String,
    }

    #[derive(Serialize)]
    pub(super) struct ConversationInitiationClientData {
        #[serde(rename = "type")]
        pub kind: &'static str,
    }

    #[derive(Serialize)]
    pub(super) struct Pong {
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub event_id: u64,
    }

    /// Events the agent sends. Tags this connector does not act on
    /// (`conversation_initiation_metadata`, `internal_tentative_agent_response`,
    /// ...) fall through to `Ignored`.
    #[derive(Deserialize, Debug)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub(super) enum ServerMessage {
        Audio {
            audio_event: AudioEvent,
        },
        Ping {
            ping_event: PingEvent,
        },
        Interruption,
        UserTranscript {
            user_transcription_event: UserTranscriptionEvent,
        },
        AgentResponse {
            agent_response_event: AgentResponseEvent,
        },
        #[serde(other)]
        Ignored,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct AudioEvent {
        pub audio_base_64: String,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct PingEvent {
        pub event_id: u64,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct UserTranscriptionEvent {
        pub user_transcript: String,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct AgentResponseEvent {
        pub agent_response: String,
    }
}

/// Runs the main loop for the ElevenLabs Conversational AI connection.
///
/// Connects to the agent's WebSocket and proxies between it and the audio
/// bridge: caller audio from `audio_rx` goes out as `user_audio_chunk`
/// messages, agent audio events are queued on the bridge for playback, and
/// an `interruption` event — the agent detecting the caller speaking over
/// playback — flushes the bridge and clears Twilio's buffer.
pub async fn run(
    config: &Arc<Config>,
    mut audio_rx: mpsc::Receiver<Bytes>,
    bridge: Arc<MediaStreamBridge>,
) -> Result<()> {
    let url = format!(
        "wss://api.elevenlabs.io/v1/convai/conversation?agent_id={}",
        config.elevenlabs_agent_id
    );
    let mut request = url.into_client_request()?;
    if let Some(api_key) = &config.elevenlabs_api_key {
        request.headers_mut().insert("xi-api-key", api_key.parse()?);
    }

    let (ws_stream, _) = connect_async(request)
        .await
        .context("Failed to connect to ElevenLabs Conversational AI WebSocket")?;
    let (mut agent_tx, mut agent_rx) = ws_stream.split();
    info!("Connected to ElevenLabs Conversational AI.");

    let init = convai_types::ConversationInitiationClientData {
        kind: "conversation_initiation_client_data",
    };
    agent_tx
        .send(WsMessage::Text(serde_json::to_string(&init)?.into()))
        .await?;

    loop {
        tokio::select! {
            biased;
            // Caller audio decoded by the bridge.
            maybe_audio = audio_rx.recv() => {
                let Some(audio) = maybe_audio else {
                    info!("Caller audio channel closed. Ending agent session.");
                    break;
                };
                let chunk = convai_types::UserAudioChunk {
                    user_audio_chunk: BASE64.encode(&audio),
                };
                agent_tx.send(WsMessage::Text(serde_json::to_string(&chunk)?.into())).await?;
            },
            // Events from the agent.
            maybe_msg = agent_rx.next() => {
                let Some(msg_result) = maybe_msg else {
                    info!("Agent closed the conversation.");
                    break;
                };
                let WsMessage::Text(text) = msg_result? else { continue };
                match serde_json::from_str::<convai_types::ServerMessage>(&text) {
                    Ok(convai_types::ServerMessage::Audio { audio_event }) => {
                        match BASE64.decode(audio_event.audio_base_64.as_bytes()) {
                            Ok(audio) => bridge.output(Bytes::from(audio)),
                            Err(e) => warn!(error = %e, "Discarding agent audio with invalid base64"),
                        }
                    }
                    Ok(convai_types::ServerMessage::Interruption) => {
                        info!("Caller spoke over playback; interrupting.");
                        bridge.interrupt().await;
                    }
                    Ok(convai_types::ServerMessage::Ping { ping_event }) => {
                        let pong = convai_types::Pong { kind: "pong", event_id: ping_event.event_id };
                        agent_tx.send(WsMessage::Text(serde_json::to_string(&pong)?.into())).await?;
                    }
                    Ok(convai_types::ServerMessage::UserTranscript { user_transcription_event }) => {
                        info!(transcript = %user_transcription_event.user_transcript, "User Transcript");
                    }
                    Ok(convai_types::ServerMessage::AgentResponse { agent_response_event }) => {
                        info!(response = %agent_response_event.agent_response, "Agent Response");
                    }
                    Ok(convai_types::ServerMessage::Ignored) => {}
                    Err(e) => warn!(error = %e, "Ignoring unparseable agent message"),
                }
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::convai_types::*;

    #[test]
    fn parses_audio_event() {
        let raw = r#"{"type": "audio", "audio_event": {"audio_base_64": "aGVsbG8=", "event_id": 7}}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::Audio { audio_event } => {
                assert_eq!(audio_event.audio_base_64, "aGVsbG8=");
            }
            other => panic!("expected audio event, got {:?}", other),
        }
    }

    #[test]
    fn parses_ping_event() {
        let raw = r#"{"type": "ping", "ping_event": {"event_id": 42, "ping_ms": 120}}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::Ping { ping_event } => assert_eq!(ping_event.event_id, 42),
            other => panic!("expected ping event, got {:?}", other),
        }
    }

    #[test]
    fn parses_interruption_with_extra_fields() {
        let raw = r#"{"type": "interruption", "interruption_event": {"event_id": 3}}"#;
        assert!(matches!(
            serde_json::from_str::<ServerMessage>(raw).unwrap(),
            ServerMessage::Interruption
        ));
    }

    #[test]
    fn parses_transcript_and_response_events() {
        let raw = r#"{"type": "user_transcript", "user_transcription_event": {"user_transcript": "hi there"}}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::UserTranscript {
                user_transcription_event,
            } => assert_eq!(user_transcription_event.user_transcript, "hi there"),
            other => panic!("expected user transcript, got {:?}", other),
        }

        let raw = r#"{"type": "agent_response", "agent_response_event": {"agent_response": "hello!"}}"#;
        match serde_json::from_str::<ServerMessage>(raw).unwrap() {
            ServerMessage::AgentResponse {
                agent_response_event,
            } => assert_eq!(agent_response_event.agent_response, "hello!"),
            other => panic!("expected agent response, got {:?}", other),
        }
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let raw = r#"{"type": "conversation_initiation_metadata", "conversation_initiation_metadata_event": {"conversation_id": "conv_1"}}"#;
        assert!(matches!(
            serde_json::from_str::<ServerMessage>(raw).unwrap(),
            ServerMessage::Ignored
        ));
    }

    #[test]
    fn serializes_client_messages() {
        let chunk = UserAudioChunk {
            user_audio_chunk: "aGVsbG8=".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&chunk).unwrap(),
            serde_json::json!({"user_audio_chunk": "aGVsbG8="})
        );

        let pong = Pong {
            kind: "pong",
            event_id: 42,
        };
        assert_eq!(
            serde_json::to_value(&pong).unwrap(),
            serde_json::json!({"type": "pong", "event_id": 42})
        );
    }
}
