//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the loaded
//! configuration and the gauges the health endpoint reports.

use crate::config::Config;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

/// The shared application state, created once at startup and passed to all
/// handlers behind an `Arc`.
pub struct AppState {
    pub config: Arc<Config>,
    /// Number of media-stream sessions currently connected.
    pub active_calls: AtomicUsize,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            active_calls: AtomicUsize::new(0),
        }
    }
}
