//! Real-time audio bridge between a Twilio media stream and a conversational
//! agent.
//!
//! The bridge sits between a bidirectional WebSocket carrying base64-framed
//! telephony audio and an agent that produces and consumes raw audio on its
//! own schedule. It is structured into submodules for clarity:
//!
//! - `protocol`: the JSON message format exchanged with Twilio.
//! - `queue`: the thread-safe playback queue drained by the delivery loop.
//! - `sink`: the transport seam the bridge writes outbound messages through.
//! - `bridge`: the session itself — inbound decoding, outbound delivery, and
//!   the interrupt path.

pub mod bridge;
pub mod protocol;
pub mod queue;
pub mod sink;

pub use bridge::{BridgeConfig, InboundAudioHandler, MediaStreamBridge};
pub use protocol::{InboundMessage, OutboundMessage};
pub use queue::PlaybackQueue;
pub use sink::{MediaSink, SinkError};
