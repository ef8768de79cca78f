//! Frame-driven animation loop and trigger flash bookkeeping

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{AnimationConfig, OscillatorConfig};
use crate::host::{FrameScheduler, FrameToken, TimerToken};
use crate::oscillator::{Oscillator, StepContext, TriggerDecision};
use crate::track::{Direction, Track, TrackId};

/// Slack allowed when a flash timer fires a hair before its deadline
const EXPIRY_TOLERANCE_SECS: f64 = 1e-3;

/// A track crossed centre and fired
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub track: TrackId,
    pub timestamp: f64,
}

/// New motion state for one track, computed from the tick's snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    pub track: TrackId,
    pub position: f64,
    pub direction: Direction,
    pub decision: TriggerDecision,
}

/// Everything one frame produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub now: f64,
    pub elapsed: f64,
    /// Frame used only to resynchronise timing; nothing moved
    pub skipped: bool,
    pub updates: Vec<TrackUpdate>,
    pub triggers: Vec<TriggerEvent>,
}

/// Drives every oscillating track once per display frame while the transport runs
#[derive(Debug, Clone)]
pub struct AnimationLoop {
    config: AnimationConfig,
    oscillator: Oscillator,
    running: bool,
    pending: Option<FrameToken>,
    last_tick: Option<f64>,
}

impl AnimationLoop {
    pub fn new(config: AnimationConfig, oscillator: OscillatorConfig) -> Self {
        Self {
            config,
            oscillator: Oscillator::new(oscillator),
            running: false,
            pending: None,
            last_tick: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.oscillator
    }

    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_tick = None;
        self.pending = Some(scheduler.request_frame());
        debug!("Animation loop started");
    }

    /// Cancel the outstanding frame and drop all phase state
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(token) = self.pending.take() {
            scheduler.cancel_frame(token);
        }
        self.running = false;
        self.last_tick = None;
        self.oscillator.clear();
        debug!("Animation loop stopped");
    }

    /// Advance every free-running track from the same `tracks` snapshot.
    ///
    /// Returns `None` for a frame that is not the one currently requested
    /// (delivered after a stop, or a duplicate). Otherwise re-arms the next
    /// frame before returning.
    pub fn tick(
        &mut self,
        token: FrameToken,
        now: f64,
        tracks: &[Track],
        speed_multiplier: f64,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<TickReport> {
        if !self.running || self.pending != Some(token) {
            return None;
        }
        self.pending = Some(scheduler.request_frame());

        let mut report = TickReport {
            now,
            ..Default::default()
        };

        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            report.skipped = true;
            return Some(report);
        };
        self.last_tick = Some(now.max(last));

        let mut elapsed = (now - last).max(0.0);
        if elapsed > self.config.max_frame_gap_secs {
            debug!(elapsed, "Long frame, capping step");
            elapsed = self.config.max_frame_gap_secs;
        }
        report.elapsed = elapsed;

        let ctx = StepContext {
            elapsed,
            now,
            speed_multiplier,
            any_soloed: tracks.iter().any(|t| t.soloed),
        };

        for track in tracks.iter().filter(|t| t.oscillating && !t.is_dragging) {
            let outcome = self.oscillator.step(track, &ctx);
            report.updates.push(TrackUpdate {
                track: track.id,
                position: outcome.position,
                direction: outcome.direction,
                decision: outcome.decision,
            });
            if outcome.fired() {
                report.triggers.push(TriggerEvent {
                    track: track.id,
                    timestamp: now,
                });
            }
        }

        if !report.triggers.is_empty() {
            trace!(count = report.triggers.len(), now, "Trigger batch");
        }
        Some(report)
    }
}

/// Tracks that fired within the last flash window.
///
/// Each batch arms its own timer. A timer only clears ids whose latest
/// deadline has passed, so a newer trigger extends an older one's window.
#[derive(Debug, Clone, Default)]
pub struct RecentTriggers {
    deadlines: HashMap<TrackId, f64>,
    batches: HashMap<TimerToken, Vec<TrackId>>,
}

impl RecentTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(
        &mut self,
        ids: &[TrackId],
        now: f64,
        flash_secs: f64,
        scheduler: &mut dyn FrameScheduler,
    ) {
        if ids.is_empty() {
            return;
        }
        let deadline = now + flash_secs;
        for id in ids {
            self.deadlines.insert(*id, deadline);
        }
        let token = scheduler.schedule_timeout(flash_secs);
        self.batches.insert(token, ids.to_vec());
    }

    /// Handle an elapsed flash timer. Returns false for unknown tokens.
    pub fn expire(&mut self, token: TimerToken, now: f64) -> bool {
        let Some(ids) = self.batches.remove(&token) else {
            return false;
        };
        for id in ids {
            let due = self
                .deadlines
                .get(&id)
                .is_some_and(|deadline| *deadline <= now + EXPIRY_TOLERANCE_SECS);
            if due {
                self.deadlines.remove(&id);
            }
        }
        true
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn ids(&self) -> BTreeSet<TrackId> {
        self.deadlines.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
        self.batches.clear();
    }
}
