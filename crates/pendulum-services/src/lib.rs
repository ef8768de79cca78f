//! pendulum-services: Threaded host, clock and sound delivery for the engine

pub mod clock;
pub mod host;
pub mod scheduler;
pub mod sound;

pub use clock::MonotonicClock;
pub use host::{HostError, HostEvent, HostHandle, HostSummary, SequencerHost};
pub use scheduler::ThreadScheduler;
pub use sound::ChannelSoundTrigger;
