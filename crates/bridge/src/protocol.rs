//! Defines the JSON message protocol exchanged with Twilio over a
//! media-stream WebSocket connection.

use serde::{Deserialize, Serialize};

/// Messages received from Twilio.
///
/// Twilio tags every frame with an `event` field. Only `start` and `media`
/// carry information the bridge acts on; every other tag (`connected`,
/// `mark`, `stop`, and whatever Twilio adds next) is accepted and ignored.
#[derive(Deserialize, Debug)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundMessage {
    /// The stream has been established; carries the stream identifier used
    /// to tag all outbound messages.
    Start { start: StartFrame },
    /// One frame of caller audio, base64-encoded in the negotiated codec.
    Media { media: MediaFrame },
    /// Any event tag the bridge does not handle.
    #[serde(other)]
    Ignored,
}

/// Payload of an inbound `start` event. Twilio sends several sibling fields
/// (`accountSid`, `callSid`, `mediaFormat`, ...); only the stream id matters
/// here and the rest are skipped during deserialization.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StartFrame {
    pub stream_sid: String,
}

/// Payload of an inbound `media` event.
#[derive(Deserialize, Debug)]
pub struct MediaFrame {
    pub payload: String,
}

/// Messages sent to Twilio.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// One frame of agent audio for playback to the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    /// Tells Twilio to discard any audio it has already buffered for
    /// playback.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub payload: String,
}

impl OutboundMessage {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        Self::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_event() {
        let raw = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "accountSid": "AC0000",
                "callSid": "CA0000",
                "streamSid": "MZ18ad3ab5a668481ce02b83e7395059f0",
                "tracks": ["inbound"]
            }
        }"#;
        match serde_json::from_str::<InboundMessage>(raw).unwrap() {
            InboundMessage::Start { start } => {
                assert_eq!(start.stream_sid, "MZ18ad3ab5a668481ce02b83e7395059f0");
            }
            other => panic!("expected start event, got {:?}", other),
        }
    }

    #[test]
    fn parses_media_event() {
        let raw = r#"{"event": "media", "media": {"track": "inbound", "payload": "aGVsbG8="}}"#;
        match serde_json::from_str::<InboundMessage>(raw).unwrap() {
            InboundMessage::Media { media } => assert_eq!(media.payload, "aGVsbG8="),
            other => panic!("expected media event, got {:?}", other),
        }
    }

    #[test]
    fn unknown_events_are_ignored_not_errors() {
        for raw in [
            r#"{"event": "connected", "protocol": "Call"}"#,
            r#"{"event": "mark", "mark": {"name": "greeting"}}"#,
            r#"{"event": "stop", "stop": {"callSid": "CA0000"}}"#,
            r#"{"event": "some_future_event"}"#,
        ] {
            let parsed = serde_json::from_str::<InboundMessage>(raw).unwrap();
            assert!(matches!(parsed, InboundMessage::Ignored), "raw: {}", raw);
        }
    }

    #[test]
    fn start_without_stream_sid_is_an_error() {
        let raw = r#"{"event": "start", "start": {"callSid": "CA0000"}}"#;
        assert!(serde_json::from_str::<InboundMessage>(raw).is_err());
    }

    #[test]
    fn media_without_payload_is_an_error() {
        let raw = r#"{"event": "media", "media": {"track": "inbound"}}"#;
        assert!(serde_json::from_str::<InboundMessage>(raw).is_err());
    }

    #[test]
    fn serializes_outbound_media_shape() {
        let msg = OutboundMessage::media("MZ123", "aGVsbG8=");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "media",
                "streamSid": "MZ123",
                "media": {"payload": "aGVsbG8="}
            })
        );
    }

    #[test]
    fn serializes_outbound_clear_shape() {
        let msg = OutboundMessage::clear("MZ123");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"event": "clear", "streamSid": "MZ123"})
        );
    }
}
