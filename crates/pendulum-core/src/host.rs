//! Capabilities the engine consumes from its host

use serde::{Deserialize, Serialize};

use crate::track::{CustomSample, DelayParams, SampleKind, Track, TrackId};

/// Monotonic time source in seconds. Must never go backward.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Fire-and-forget sound playback. Implementations must return immediately.
pub trait SoundTrigger {
    fn play(&mut self, request: SoundRequest);
}

/// Handle for a requested display frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Handle for a one-shot timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// Refresh-rate scheduling plus one-shot timers.
///
/// The host delivers a requested frame by calling `Sequencer::on_frame` with the
/// returned token, and an elapsed timeout through `Sequencer::on_timeout`.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameToken;
    fn cancel_frame(&mut self, token: FrameToken);
    fn schedule_timeout(&mut self, delay_secs: f64) -> TimerToken;
}

/// Everything the audio side needs to voice one trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundRequest {
    pub track: TrackId,
    pub sample: SampleKind,
    pub decay: f32,
    pub volume: f32,
    pub pitch: f32,
    pub attack: f32,
    pub delay: Option<DelayParams>,
    pub custom_sample: Option<CustomSample>,
}

impl SoundRequest {
    pub fn for_track(track: &Track) -> Self {
        Self {
            track: track.id,
            sample: track.sample,
            decay: track.decay,
            volume: track.volume,
            pitch: track.pitch,
            attack: track.attack,
            delay: track.delay,
            custom_sample: track.custom_sample.clone(),
        }
    }
}

/// A pointer sample from the host surface (pixels, seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: u64,
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

impl PointerEvent {
    pub fn new(pointer_id: u64, x: f64, y: f64, timestamp: f64) -> Self {
        Self { pointer_id, x, y, timestamp }
    }
}
