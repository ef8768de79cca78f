//! Engine tuning constants, loadable from TOML by the host

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::{PendulumError, Result};

/// Upper bound on tracks in one session
pub const MAX_TRACKS: usize = 64;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub oscillator: OscillatorConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub track_count: usize,
    pub default_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            track_count: 8,
            default_bpm: 120.0,
            min_bpm: 40.0,
            max_bpm: 240.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorConfig {
    /// Radians of phase per second at speed 1 and reference tempo
    pub phase_rate: f64,
    /// Tempo at which the global speed multiplier is 1.0
    pub reference_bpm: f64,
    /// Minimum seconds between triggers on one track, at reference tempo
    pub debounce_secs: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            phase_rate: TAU,
            reference_bpm: 120.0,
            debounce_secs: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub pixels_per_amplitude: f64,
    pub max_amplitude: f64,
    /// Fraction of the amplitude shown as position while dragging
    pub drag_damping: f64,
    /// Blend factor for the horizontal drag delta (1.0 = no smoothing)
    pub delta_smoothing: f64,
    /// Blend factor for the release velocity estimate
    pub velocity_smoothing: f64,
    /// Minimum |position| at release that starts oscillation
    pub activation_threshold: f64,
    pub min_release_speed: f64,
    pub max_release_speed: f64,
    /// Velocity (px/s) at which release speed reaches ~63% of its range
    pub release_velocity_scale: f64,
    /// Pointer moves closer together than 1/max_update_hz are dropped
    pub max_update_hz: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pixels_per_amplitude: 150.0,
            max_amplitude: 1.0,
            drag_damping: 0.6,
            delta_smoothing: 0.5,
            velocity_smoothing: 0.15,
            activation_threshold: 0.03,
            min_release_speed: 0.7,
            max_release_speed: 2.0,
            release_velocity_scale: 1200.0,
            max_update_hz: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// How long a triggered track stays in the recently-triggered set
    pub flash_secs: f64,
    /// Longest step a single frame may advance the simulation
    pub max_frame_gap_secs: f64,
    /// Refresh rate requested from the host's frame ticker
    pub frame_rate_hz: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            flash_secs: 0.15,
            max_frame_gap_secs: 0.25,
            frame_rate_hz: 60.0,
        }
    }
}

fn require(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(PendulumError::InvalidConfig(what.to_string()))
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn unit_blend(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let s = &self.session;
        require(
            (1..=MAX_TRACKS).contains(&s.track_count),
            "session.track_count must be between 1 and 64",
        )?;
        require(positive(s.min_bpm), "session.min_bpm must be positive")?;
        require(
            s.max_bpm.is_finite() && s.max_bpm >= s.min_bpm,
            "session.max_bpm must be at least session.min_bpm",
        )?;
        require(
            s.default_bpm.is_finite() && s.default_bpm >= s.min_bpm && s.default_bpm <= s.max_bpm,
            "session.default_bpm must lie within the bpm range",
        )?;

        let o = &self.oscillator;
        require(positive(o.phase_rate), "oscillator.phase_rate must be positive")?;
        require(positive(o.reference_bpm), "oscillator.reference_bpm must be positive")?;
        require(
            o.debounce_secs.is_finite() && o.debounce_secs >= 0.0,
            "oscillator.debounce_secs must not be negative",
        )?;

        let g = &self.gesture;
        require(positive(g.pixels_per_amplitude), "gesture.pixels_per_amplitude must be positive")?;
        require(positive(g.max_amplitude), "gesture.max_amplitude must be positive")?;
        require(unit_blend(g.drag_damping), "gesture.drag_damping must be in (0, 1]")?;
        require(unit_blend(g.delta_smoothing), "gesture.delta_smoothing must be in (0, 1]")?;
        require(unit_blend(g.velocity_smoothing), "gesture.velocity_smoothing must be in (0, 1]")?;
        require(
            g.activation_threshold.is_finite()
                && g.activation_threshold >= 0.0
                && g.activation_threshold < g.max_amplitude * g.drag_damping,
            "gesture.activation_threshold must be reachable by a full drag",
        )?;
        require(positive(g.min_release_speed), "gesture.min_release_speed must be positive")?;
        require(
            g.max_release_speed.is_finite() && g.max_release_speed >= g.min_release_speed,
            "gesture.max_release_speed must be at least gesture.min_release_speed",
        )?;
        require(positive(g.release_velocity_scale), "gesture.release_velocity_scale must be positive")?;
        require(positive(g.max_update_hz), "gesture.max_update_hz must be positive")?;

        let a = &self.animation;
        require(
            a.flash_secs.is_finite() && a.flash_secs >= 0.0,
            "animation.flash_secs must not be negative",
        )?;
        require(positive(a.max_frame_gap_secs), "animation.max_frame_gap_secs must be positive")?;
        require(positive(a.frame_rate_hz), "animation.frame_rate_hz must be positive")?;
        Ok(())
    }
}
