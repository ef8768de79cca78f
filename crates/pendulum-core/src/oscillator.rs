//! Phase integration, zero-crossing detection and trigger decisions
//!
//! Each oscillating track owns an unbounded phase that only ever grows while the
//! track runs. Position is `amplitude * sin(phase)`, so a zero crossing is the
//! phase passing a multiple of π. Counting half-cycle boundaries rather than
//! comparing float signs keeps the count exact when a single tick spans more
//! than one crossing or lands precisely on the centre line.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use crate::config::OscillatorConfig;
use crate::track::{Direction, Track, TrackId};

/// Amplitudes at or below this are treated as stationary
pub const AMPLITUDE_EPSILON: f64 = 1e-9;

/// Per-track oscillation bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseState {
    pub phase: f64,
    /// Crossings seen since the last promoted trigger, modulo time signature
    pub crossings: u32,
}

impl PhaseState {
    /// Phase that reproduces the track's current position while moving in its
    /// current direction.
    pub fn seeded(track: &Track) -> Self {
        let ratio = if track.amplitude > AMPLITUDE_EPSILON {
            (track.position / track.amplitude).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let base = ratio.abs().asin();
        let phase = match (track.direction, ratio >= 0.0) {
            (Direction::LeftToRight, true) => base,
            (Direction::LeftToRight, false) => TAU - base,
            (Direction::RightToLeft, true) => PI - base,
            (Direction::RightToLeft, false) => PI + base,
        };
        Self { phase, crossings: 0 }
    }
}

/// Index of the half cycle containing `phase`. Even halves are non-negative
/// and rising through centre; odd halves are negative.
fn half_cycle(phase: f64) -> i64 {
    (phase / PI).floor() as i64
}

/// Inputs shared by every track advanced in one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    pub elapsed: f64,
    pub now: f64,
    pub speed_multiplier: f64,
    pub any_soloed: bool,
}

/// What became of a tick's zero crossing(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// No crossing this tick
    None,
    /// Crossing absorbed by the time-signature subdivision
    Subdivided,
    /// Promoted, but too soon after the previous trigger
    Debounced,
    /// Promoted, but muted or silenced by another track's solo
    Gated,
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub position: f64,
    pub direction: Direction,
    pub crossings: u64,
    pub decision: TriggerDecision,
}

impl StepOutcome {
    pub fn fired(&self) -> bool {
        self.decision == TriggerDecision::Fire
    }
}

/// Advances tracks and decides triggers. Owns the phase arena keyed by track id.
#[derive(Debug, Clone)]
pub struct Oscillator {
    config: OscillatorConfig,
    phases: HashMap<TrackId, PhaseState>,
}

impl Oscillator {
    pub fn new(config: OscillatorConfig) -> Self {
        Self {
            config,
            phases: HashMap::new(),
        }
    }

    pub fn config(&self) -> &OscillatorConfig {
        &self.config
    }

    /// Minimum spacing between triggers at the given global speed
    pub fn min_interval(&self, speed_multiplier: f64) -> f64 {
        self.config.debounce_secs / speed_multiplier.max(f64::EPSILON)
    }

    pub fn phase_state(&self, id: TrackId) -> Option<&PhaseState> {
        self.phases.get(&id)
    }

    /// Drop a track's phase; the next step re-seeds it from position and direction
    pub fn forget(&mut self, id: TrackId) {
        self.phases.remove(&id);
    }

    pub fn clear(&mut self) {
        self.phases.clear();
    }

    /// Advance one track by `ctx.elapsed` seconds. The track itself is not
    /// modified; the caller applies the outcome.
    pub fn step(&mut self, track: &Track, ctx: &StepContext) -> StepOutcome {
        let rate = self.config.phase_rate;
        let min_interval = self.min_interval(ctx.speed_multiplier);
        let state = self
            .phases
            .entry(track.id)
            .or_insert_with(|| PhaseState::seeded(track));

        let before = half_cycle(state.phase);
        let advance = ctx.elapsed.max(0.0) * track.speed.max(0.0) * ctx.speed_multiplier.max(0.0) * rate;
        state.phase += advance;
        let after = half_cycle(state.phase);

        if track.amplitude <= AMPLITUDE_EPSILON {
            return StepOutcome {
                position: 0.0,
                direction: track.direction,
                crossings: 0,
                decision: TriggerDecision::None,
            };
        }

        let position = track.amplitude * state.phase.sin();
        let crossings = (after - before).max(0) as u64;
        if crossings == 0 {
            return StepOutcome {
                position,
                direction: track.direction,
                crossings,
                decision: TriggerDecision::None,
            };
        }

        let direction = if after.rem_euclid(2) == 0 {
            Direction::LeftToRight
        } else {
            Direction::RightToLeft
        };

        let time_signature = u64::from(track.time_signature.max(1));
        let total = u64::from(state.crossings) + crossings;
        state.crossings = (total % time_signature) as u32;

        let decision = if total < time_signature {
            TriggerDecision::Subdivided
        } else if track
            .last_trigger_time
            .is_some_and(|last| ctx.now - last < min_interval)
        {
            TriggerDecision::Debounced
        } else if !track.is_audible(ctx.any_soloed) {
            TriggerDecision::Gated
        } else {
            TriggerDecision::Fire
        };

        StepOutcome {
            position,
            direction,
            crossings,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn ctx(elapsed: f64, now: f64) -> StepContext {
        StepContext {
            elapsed,
            now,
            speed_multiplier: 1.0,
            any_soloed: false,
        }
    }

    fn swinging_track(amplitude: f64, position: f64) -> Track {
        let mut track = Track::new(0);
        track.speed = 1.0;
        track.amplitude = amplitude;
        track.position = position;
        track.set_oscillating(true);
        track
    }

    /// Run `steps` ticks, feeding each outcome back into the track like the loop does
    fn run(osc: &mut Oscillator, track: &mut Track, steps: usize, elapsed: f64) -> Vec<StepOutcome> {
        let mut now = 10.0;
        (0..steps)
            .map(|_| {
                now += elapsed;
                let out = osc.step(track, &ctx(elapsed, now));
                track.position = out.position;
                track.direction = out.direction;
                if out.fired() {
                    track.last_trigger_time = Some(now);
                }
                out
            })
            .collect()
    }

    #[test]
    fn test_half_cycle_from_zero_flips_direction() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let track = swinging_track(1.0, 0.0);
        assert_eq!(track.direction, Direction::LeftToRight);

        // 0.5s at speed 1 and rate 2π advances exactly π
        let out = osc.step(&track, &ctx(0.5, 1.0));
        assert_eq!(osc.phase_state(track.id).map(|s| s.phase), Some(PI));
        assert_eq!(out.crossings, 1);
        assert_eq!(out.direction, Direction::RightToLeft);
        assert_eq!(out.decision, TriggerDecision::Fire);
    }

    #[test]
    fn test_small_steps_through_half_cycle_cross_once() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let mut track = swinging_track(1.0, 0.0);
        let outcomes = run(&mut osc, &mut track, 101, 0.005);
        let crossings: u64 = outcomes.iter().map(|o| o.crossings).sum();
        assert_eq!(crossings, 1);
        assert_eq!(track.direction, Direction::RightToLeft);
        assert!(track.position < 0.0);
    }

    #[test]
    fn test_position_stays_within_amplitude() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let mut track = swinging_track(0.7, 0.2);
        for out in run(&mut osc, &mut track, 500, 0.016) {
            assert!(out.position.abs() <= 0.7 + 1e-12);
        }
    }

    #[test]
    fn test_zero_amplitude_is_inert() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let mut track = swinging_track(0.0, 0.0);
        let outcomes = run(&mut osc, &mut track, 200, 0.05);
        assert!(outcomes.iter().all(|o| o.position == 0.0 && o.decision == TriggerDecision::None));
    }

    #[test]
    fn test_time_signature_three_fires_every_third_crossing() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        // Start at the peak so crossings land mid-tick, away from float edges
        let mut track = swinging_track(1.0, 1.0);
        track.time_signature = 3;
        let outcomes = run(&mut osc, &mut track, 6, 0.5);

        assert!(outcomes.iter().all(|o| o.crossings == 1));
        let fired = outcomes.iter().filter(|o| o.fired()).count();
        assert_eq!(fired, 2);
        assert_eq!(outcomes[2].decision, TriggerDecision::Fire);
        assert_eq!(outcomes[5].decision, TriggerDecision::Fire);
    }

    #[test]
    fn test_time_signature_change_applies_going_forward() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let mut track = swinging_track(1.0, 1.0);
        track.time_signature = 4;
        run(&mut osc, &mut track, 2, 0.5);
        assert_eq!(osc.phase_state(track.id).map(|s| s.crossings), Some(2));

        track.time_signature = 2;
        let outcomes = run(&mut osc, &mut track, 1, 0.5);
        assert_eq!(outcomes[0].decision, TriggerDecision::Fire);
    }

    #[test]
    fn test_debounce_suppresses_close_triggers() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let mut track = swinging_track(1.0, 1.0);

        let first = osc.step(&track, &ctx(0.5, 1.0));
        assert!(first.fired());
        track.last_trigger_time = Some(1.0);
        track.position = first.position;
        track.direction = first.direction;

        let second = osc.step(&track, &ctx(0.5, 1.1));
        assert_eq!(second.crossings, 1);
        assert_eq!(second.decision, TriggerDecision::Debounced);

        let third = osc.step(&track, &ctx(0.5, 1.4));
        assert!(third.fired());
    }

    #[test]
    fn test_min_interval_shrinks_with_tempo() {
        let osc = Oscillator::new(OscillatorConfig::default());
        assert!((osc.min_interval(1.0) - 0.3).abs() < 1e-12);
        assert!((osc.min_interval(2.0) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_gating_does_not_stop_motion() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let mut track = swinging_track(1.0, 1.0);
        track.muted = true;
        let out = osc.step(&track, &ctx(0.5, 1.0));
        assert_eq!(out.decision, TriggerDecision::Gated);
        assert_eq!(out.direction, Direction::RightToLeft);
        assert!(out.position < 0.0);

        let mut other = swinging_track(1.0, 1.0);
        other.id = TrackId(1);
        let soloed_elsewhere = StepContext { any_soloed: true, ..ctx(0.5, 1.0) };
        assert_eq!(osc.step(&other, &soloed_elsewhere).decision, TriggerDecision::Gated);
    }

    #[test]
    fn test_seeding_preserves_position_and_direction() {
        for (position, direction) in [
            (0.6, Direction::LeftToRight),
            (-0.6, Direction::LeftToRight),
            (0.6, Direction::RightToLeft),
            (-0.6, Direction::RightToLeft),
        ] {
            let mut track = swinging_track(1.0, position);
            track.direction = direction;
            let mut osc = Oscillator::new(OscillatorConfig::default());
            let out = osc.step(&track, &ctx(1e-4, 1.0));
            assert!((out.position - position).abs() < 1e-3);
            let moving_right = out.position > position;
            assert_eq!(moving_right, direction == Direction::LeftToRight);
        }
    }

    #[test]
    fn test_forget_reseeds_phase() {
        let mut osc = Oscillator::new(OscillatorConfig::default());
        let track = swinging_track(1.0, 1.0);
        osc.step(&track, &ctx(0.3, 1.0));
        osc.forget(track.id);
        assert!(osc.phase_state(track.id).is_none());
        osc.step(&track, &ctx(0.0, 1.0));
        let phase = osc.phase_state(track.id).map(|s| s.phase).unwrap_or_default();
        assert!((phase - FRAC_PI_2).abs() < 1e-12);
    }
}
