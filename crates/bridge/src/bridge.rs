//! The media-stream bridge: session state, inbound decoding, the outbound
//! delivery loop, and the interrupt path.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::protocol::{InboundMessage, OutboundMessage};
use crate::queue::PlaybackQueue;
use crate::sink::MediaSink;

/// Invoked synchronously with each decoded frame of caller audio, in arrival
/// order. Registered once at [`MediaStreamBridge::start`]. Runs on the
/// transport's receive path, so it must hand work off rather than block.
pub type InboundAudioHandler = Box<dyn Fn(Bytes) + Send + Sync>;

/// Tuning knobs for a [`MediaStreamBridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Upper bound on queued playback frames. `None` grows without bound; a
    /// bound drops the oldest frame when the agent outpaces the caller's
    /// connection.
    pub queue_capacity: Option<usize>,
    /// How long [`MediaStreamBridge::stop`] waits for the delivery loop to
    /// exit before giving up on the join.
    pub stop_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Bridges one Twilio media stream to a conversational agent.
///
/// Caller audio arrives as base64-framed JSON messages on the transport's
/// receive loop; [`handle_message`](Self::handle_message) decodes each frame
/// and hands it to the registered handler. Agent audio arrives through
/// [`output`](Self::output) at whatever pace the agent produces it and is
/// delivered to the transport, in order, by a dedicated background task.
/// [`interrupt`](Self::interrupt) discards any not-yet-sent agent audio and
/// tells Twilio to clear its playback buffer.
///
/// No failure inside the bridge is ever surfaced to the agent or the
/// transport caller: bad frames are skipped, failed sends are dropped, and
/// the session keeps running until [`stop`](Self::stop).
pub struct MediaStreamBridge {
    sink: Arc<dyn MediaSink>,
    queue: Arc<PlaybackQueue>,
    stream_sid: Arc<RwLock<Option<String>>>,
    input_handler: RwLock<Option<InboundAudioHandler>>,
    shutdown: watch::Sender<bool>,
    delivery: Mutex<Option<JoinHandle<()>>>,
    stop_timeout: Duration,
}

impl MediaStreamBridge {
    pub fn new(sink: Arc<dyn MediaSink>, config: BridgeConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sink,
            queue: Arc::new(PlaybackQueue::new(config.queue_capacity)),
            stream_sid: Arc::new(RwLock::new(None)),
            input_handler: RwLock::new(None),
            shutdown,
            delivery: Mutex::new(None),
            stop_timeout: config.stop_timeout,
        }
    }

    /// Registers the caller-audio handler and launches the delivery loop.
    /// Call once per bridge instance.
    pub fn start(&self, handler: InboundAudioHandler) {
        let mut delivery = self.delivery.lock();
        if delivery.is_some() {
            warn!("bridge already started; ignoring duplicate start");
            return;
        }
        *self.input_handler.write() = Some(handler);

        let queue = self.queue.clone();
        let sink = self.sink.clone();
        let stream_sid = self.stream_sid.clone();
        let shutdown = self.shutdown.subscribe();
        *delivery = Some(tokio::spawn(deliver_outbound(
            queue, sink, stream_sid, shutdown,
        )));
    }

    /// Signals the delivery loop to exit and waits for it, bounded by the
    /// configured timeout. Returns either way; after a timeout the loop task
    /// is abandoned, not forcibly killed. Clears the stream id.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.delivery.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(self.stop_timeout, handle).await {
                Ok(Ok(())) => debug!("delivery loop joined"),
                Ok(Err(e)) => error!(error = %e, "delivery loop task failed"),
                Err(_) => warn!(
                    timeout = ?self.stop_timeout,
                    "delivery loop did not exit in time; abandoning join"
                ),
            }
        }
        *self.stream_sid.write() = None;
    }

    /// Queues one frame of agent audio for playback to the caller. Never
    /// blocks and never fails; see [`BridgeConfig::queue_capacity`] for what
    /// happens under sustained overflow.
    pub fn output(&self, audio: Bytes) {
        self.queue.push(audio);
    }

    /// Discards all queued agent audio and tells Twilio to clear whatever it
    /// has already buffered for playback.
    ///
    /// The clear message is sent even when nothing was queued. Audio the
    /// agent enqueues concurrently with the flush may still be delivered
    /// afterwards; the interrupt is best-effort, not a barrier.
    pub async fn interrupt(&self) {
        let flushed = self.queue.drain().len();
        if flushed > 0 {
            debug!(flushed, "flushed pending playback frames");
        }
        let Some(stream_sid) = self.stream_sid.read().clone() else {
            debug!("interrupt before stream start; nothing to clear");
            return;
        };
        if let Err(e) = self.sink.send(OutboundMessage::clear(stream_sid)).await {
            error!(error = %e, "failed to send clear message");
        }
    }

    /// Processes one raw frame from the transport's receive loop.
    ///
    /// Synchronous and non-blocking: it records the stream id on `start`,
    /// decodes `media` payloads and hands them to the registered handler,
    /// and skips everything else. A malformed frame is logged and dropped;
    /// the next frame is processed normally.
    pub fn handle_message(&self, raw: &str) {
        let message = match serde_json::from_str::<InboundMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "discarding malformed media-stream frame");
                return;
            }
        };
        match message {
            InboundMessage::Start { start } => {
                info!(stream_sid = %start.stream_sid, "media stream started");
                *self.stream_sid.write() = Some(start.stream_sid);
            }
            InboundMessage::Media { media } => {
                let audio = match BASE64.decode(media.payload.as_bytes()) {
                    Ok(audio) => audio,
                    Err(e) => {
                        error!(error = %e, "discarding media frame with invalid base64 payload");
                        return;
                    }
                };
                if let Some(handler) = self.input_handler.read().as_ref() {
                    handler(Bytes::from(audio));
                }
            }
            InboundMessage::Ignored => {}
        }
    }

    /// The stream id adopted from the inbound `start` event, if one has
    /// arrived.
    pub fn stream_sid(&self) -> Option<String> {
        self.stream_sid.read().clone()
    }
}

/// Drains the playback queue and writes each frame to the transport until
/// shutdown is signalled.
///
/// A frame that arrives before the `start` event has supplied a stream id is
/// dropped: there is nothing to address it to. A failed send drops that one
/// frame and the loop continues; the transport may recover, or the session
/// owner will stop the bridge.
async fn deliver_outbound(
    queue: Arc<PlaybackQueue>,
    sink: Arc<dyn MediaSink>,
    stream_sid: Arc<RwLock<Option<String>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            frame = queue.pop() => frame,
        };
        let Some(sid) = stream_sid.read().clone() else {
            debug!("dropping outbound frame produced before stream start");
            continue;
        };
        let message = OutboundMessage::media(sid, BASE64.encode(&frame));
        if let Err(e) = sink.send(message).await {
            error!(error = %e, "failed to deliver outbound audio frame");
        }
    }
    debug!("delivery loop exited");
}
