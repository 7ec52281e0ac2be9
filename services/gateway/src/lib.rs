//! Switchboard Gateway Library Crate
//!
//! This library contains all the logic for the voice gateway service: the
//! application state, configuration, HTTP handlers (health and call setup),
//! the media-stream WebSocket session, and the ElevenLabs conversational
//! agent connector. The `gateway` binary is a thin wrapper around this
//! library.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod twiml;
pub mod ws;
