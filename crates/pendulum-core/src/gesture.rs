//! Drag-to-oscillation gesture mapping
//!
//! A drag on a track's node stretches it sideways: the smoothed horizontal
//! distance from the press point sets the amplitude, and the smoothed pointer
//! velocity at release sets the oscillation speed. Sessions are keyed by track,
//! so several pointers can drag distinct tracks at once.

use std::collections::HashMap;

use tracing::debug;

use crate::config::GestureConfig;
use crate::host::PointerEvent;
use crate::track::{Track, TrackId};

/// State of one in-progress drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub track: TrackId,
    pub pointer_id: u64,
    /// Whether the track was oscillating when grabbed
    pub was_oscillating: bool,
    start_x: f64,
    last_x: f64,
    last_time: f64,
    last_update: f64,
    smoothed_delta: f64,
    /// Smoothed horizontal velocity in px/s
    velocity: f64,
    amplitude: f64,
    position: f64,
}

impl DragSession {
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }
}

/// Track mutation requested by a gesture transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    /// Pointer pressed on the node: freeze the track under the pointer
    Grab { track: TrackId },
    /// Pointer moved: show the stretched node
    Stretch {
        track: TrackId,
        amplitude: f64,
        position: f64,
    },
    /// Released past the activation threshold: start oscillating
    Activate {
        track: TrackId,
        amplitude: f64,
        position: f64,
        speed: f64,
    },
    /// Released without enough stretch: return the track to rest
    Release { track: TrackId, was_oscillating: bool },
}

impl GestureEffect {
    pub fn track(&self) -> TrackId {
        match *self {
            Self::Grab { track }
            | Self::Stretch { track, .. }
            | Self::Activate { track, .. }
            | Self::Release { track, .. } => track,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DragGestureMapper {
    config: GestureConfig,
    sessions: HashMap<TrackId, DragSession>,
    pointers: HashMap<u64, TrackId>,
}

impl DragGestureMapper {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            pointers: HashMap::new(),
        }
    }

    pub fn is_dragging(&self, track: TrackId) -> bool {
        self.sessions.contains_key(&track)
    }

    pub fn session(&self, track: TrackId) -> Option<&DragSession> {
        self.sessions.get(&track)
    }

    pub fn active_tracks(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.sessions.keys().copied()
    }

    /// Abandon every session without producing effects
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.pointers.clear();
    }

    /// Map a smoothed release velocity (px/s) to an oscillation speed.
    /// Monotonic in |velocity| and bounded by the configured release range.
    pub fn release_speed(&self, velocity: f64) -> f64 {
        let (min, max) = (self.config.min_release_speed, self.config.max_release_speed);
        if !velocity.is_finite() {
            return if velocity.is_nan() { min } else { max };
        }
        let t = 1.0 - (-velocity.abs() / self.config.release_velocity_scale).exp();
        (min + (max - min) * t).clamp(min, max)
    }

    pub fn pointer_down(&mut self, track: &Track, event: PointerEvent) -> Option<GestureEffect> {
        if !(event.x.is_finite() && event.timestamp.is_finite()) {
            return None;
        }
        if self.sessions.contains_key(&track.id) || self.pointers.contains_key(&event.pointer_id) {
            return None;
        }

        let session = DragSession {
            track: track.id,
            pointer_id: event.pointer_id,
            was_oscillating: track.oscillating,
            start_x: event.x,
            last_x: event.x,
            last_time: event.timestamp,
            last_update: event.timestamp,
            smoothed_delta: 0.0,
            velocity: 0.0,
            amplitude: 0.0,
            position: 0.0,
        };
        self.pointers.insert(event.pointer_id, track.id);
        self.sessions.insert(track.id, session);
        debug!(track = track.id.0, pointer = event.pointer_id, "Drag started");
        Some(GestureEffect::Grab { track: track.id })
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> Option<GestureEffect> {
        let track = *self.pointers.get(&event.pointer_id)?;
        let min_gap = 1.0 / self.config.max_update_hz;
        let config = &self.config;
        let session = self.sessions.get_mut(&track)?;

        if event.timestamp - session.last_update < min_gap {
            return None;
        }
        if !sample(session, config, event) {
            return None;
        }
        session.last_update = event.timestamp;

        Some(GestureEffect::Stretch {
            track,
            amplitude: session.amplitude,
            position: session.position,
        })
    }

    /// Finish the drag owned by `event.pointer_id`, folding in the release sample
    pub fn pointer_up(&mut self, event: PointerEvent) -> Option<GestureEffect> {
        let track = self.pointers.remove(&event.pointer_id)?;
        let mut session = self.sessions.remove(&track)?;
        sample(&mut session, &self.config, event);
        Some(self.finish(session))
    }

    /// Finish the drag owned by `pointer_id` using the last accepted sample
    pub fn pointer_cancel(&mut self, pointer_id: u64) -> Option<GestureEffect> {
        let track = self.pointers.remove(&pointer_id)?;
        let session = self.sessions.remove(&track)?;
        Some(self.finish(session))
    }

    /// Pointer left the surface: every drag ends as if released
    pub fn pointer_leave(&mut self) -> Vec<GestureEffect> {
        let mut pointers: Vec<u64> = self.pointers.keys().copied().collect();
        pointers.sort_unstable();
        pointers
            .into_iter()
            .filter_map(|pointer_id| self.pointer_cancel(pointer_id))
            .collect()
    }

    fn finish(&self, session: DragSession) -> GestureEffect {
        if session.position.abs() > self.config.activation_threshold {
            let speed = self.release_speed(session.velocity);
            debug!(
                track = session.track.0,
                amplitude = session.amplitude,
                velocity = session.velocity,
                speed,
                "Drag released into oscillation"
            );
            GestureEffect::Activate {
                track: session.track,
                amplitude: session.amplitude,
                position: session.position,
                speed,
            }
        } else {
            debug!(track = session.track.0, "Drag released below threshold");
            GestureEffect::Release {
                track: session.track,
                was_oscillating: session.was_oscillating,
            }
        }
    }
}

/// Fold one pointer sample into the session. Returns false for unusable input.
fn sample(session: &mut DragSession, config: &GestureConfig, event: PointerEvent) -> bool {
    if !(event.x.is_finite() && event.timestamp.is_finite()) {
        return false;
    }

    let delta = event.x - session.start_x;
    let beta = config.delta_smoothing;
    session.smoothed_delta = session.smoothed_delta * (1.0 - beta) + delta * beta;

    let dt = event.timestamp - session.last_time;
    if dt > 0.0 {
        let instantaneous = (event.x - session.last_x) / dt;
        let alpha = config.velocity_smoothing;
        session.velocity = session.velocity * (1.0 - alpha) + instantaneous * alpha;
        session.last_time = event.timestamp;
    }
    session.last_x = event.x;

    session.amplitude = (session.smoothed_delta.abs() / config.pixels_per_amplitude).min(config.max_amplitude);
    session.position = if session.smoothed_delta < 0.0 {
        -session.amplitude * config.drag_damping
    } else {
        session.amplitude * config.drag_damping
    };
    true
}
