//! Fire-and-forget delivery of sound requests to an audio thread

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use pendulum_core::{SoundRequest, SoundTrigger};
use tracing::{debug, warn};

/// Pushes requests into a bounded channel without ever blocking the engine
#[derive(Debug, Clone)]
pub struct ChannelSoundTrigger {
    tx: Sender<SoundRequest>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSoundTrigger {
    pub fn new(tx: Sender<SoundRequest>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Trigger plus the receiving end for the audio consumer
    pub fn channel(capacity: usize) -> (Self, Receiver<SoundRequest>) {
        let (tx, rx) = bounded(capacity);
        (Self::new(tx), rx)
    }

    /// Requests lost to a full or closed channel
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SoundTrigger for ChannelSoundTrigger {
    fn play(&mut self, request: SoundRequest) {
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(track = request.track.0, "Sound channel full, dropping trigger");
            }
            Err(TrySendError::Disconnected(request)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(track = request.track.0, "Sound consumer gone, dropping trigger");
            }
        }
    }
}
