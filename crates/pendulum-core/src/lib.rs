//! pendulum-core: Engine for the pendulum polyrhythm sequencer

pub mod animation;
pub mod config;
mod error;
pub mod gesture;
pub mod host;
pub mod oscillator;
mod sequencer;
mod track;
mod transport;

#[cfg(test)]
mod test_support;

pub use animation::{AnimationLoop, RecentTriggers, TickReport, TrackUpdate, TriggerEvent};
pub use config::{AnimationConfig, EngineConfig, GestureConfig, OscillatorConfig, SessionConfig, MAX_TRACKS};
pub use error::{PendulumError, Result};
pub use gesture::{DragGestureMapper, DragSession, GestureEffect};
pub use host::{Clock, FrameScheduler, FrameToken, PointerEvent, SoundRequest, SoundTrigger, TimerToken};
pub use oscillator::{Oscillator, PhaseState, StepContext, StepOutcome, TriggerDecision};
pub use sequencer::Sequencer;
pub use track::{
    default_tracks, CustomSample, DelayParams, Direction, SampleKind, Track, TrackId, TrackParam,
    ATTACK_RANGE, DECAY_RANGE, PITCH_RANGE, SPEED_RANGE, TIME_SIGNATURE_RANGE, TRACK_COLORS, VOLUME_RANGE_DB,
};
pub use transport::{Transport, TransportState};
