//! Threaded host for the sequencer engine
//!
//! The engine is single-threaded. `SequencerHost` owns it and serialises
//! every input (pointer, transport and parameter events from any thread,
//! timer expiries, display ticks) onto the thread that calls `run`.

use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use pendulum_core::{
    Clock, EngineConfig, PendulumError, PointerEvent, Sequencer, SoundTrigger, TimerToken, Track,
    TrackId, TrackParam,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::MonotonicClock;
use crate::scheduler::ThreadScheduler;

const EVENT_CAPACITY: usize = 256;
const TIMER_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Host event channel disconnected")]
    Disconnected,
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(#[from] PendulumError),
}

/// Input delivered to the engine thread
#[derive(Debug, Clone)]
pub enum HostEvent {
    PointerDown { track: TrackId, event: PointerEvent },
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    PointerCancel(u64),
    PointerLeave,
    UpdateParam { track: TrackId, param: TrackParam },
    SelectTrack(Option<TrackId>),
    Play,
    Stop,
    TogglePlay,
    SetBpm(f64),
    CreateSession(usize),
    Reset,
    /// Reply with a copy of the current tracks
    Snapshot(Sender<Vec<Track>>),
    Shutdown,
}

/// Cloneable sender side of a running host
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: Sender<HostEvent>,
    clock: MonotonicClock,
}

impl HostHandle {
    pub fn send(&self, event: HostEvent) -> Result<(), HostError> {
        self.tx.send(event).map_err(|_| HostError::Disconnected)
    }

    /// Engine time, for stamping pointer events
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Pointer event stamped with the current engine time
    pub fn pointer(&self, pointer_id: u64, x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(pointer_id, x, y, self.now())
    }

    pub fn update_param(&self, track: TrackId, param: TrackParam) -> Result<(), HostError> {
        self.send(HostEvent::UpdateParam { track, param })
    }

    pub fn snapshot(&self) -> Result<Vec<Track>, HostError> {
        let (tx, rx) = bounded(1);
        self.send(HostEvent::Snapshot(tx))?;
        rx.recv().map_err(|_| HostError::Disconnected)
    }

    pub fn shutdown(&self) -> Result<(), HostError> {
        self.send(HostEvent::Shutdown)
    }
}

/// What the host did before it shut down
#[derive(Debug, Clone, Serialize)]
pub struct HostSummary {
    pub frames: u64,
    pub triggers: u64,
    pub bpm: f64,
    pub tracks: Vec<Track>,
}

pub struct SequencerHost {
    sequencer: Sequencer,
    frames: ThreadScheduler,
    events: Receiver<HostEvent>,
    timers: Receiver<TimerToken>,
    frame_interval: Duration,
    frames_delivered: u64,
    triggers: u64,
}

impl SequencerHost {
    pub fn new(
        config: EngineConfig,
        sound: Box<dyn SoundTrigger>,
    ) -> Result<(Self, HostHandle), HostError> {
        config.validate()?;
        let frame_interval = Duration::try_from_secs_f64(1.0 / config.animation.frame_rate_hz)
            .map_err(|_| PendulumError::InvalidConfig("frame_rate_hz must be positive".into()))?;

        let (tx, events) = bounded(EVENT_CAPACITY);
        let (timer_tx, timers) = bounded(TIMER_CAPACITY);
        let clock = MonotonicClock::new();
        let frames = ThreadScheduler::new(timer_tx);
        let sequencer = Sequencer::new(config, Box::new(clock), sound, Box::new(frames.clone()))?;

        let host = Self {
            sequencer,
            frames,
            events,
            timers,
            frame_interval,
            frames_delivered: 0,
            triggers: 0,
        };
        Ok((host, HostHandle { tx, clock }))
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Process events until `Shutdown`. Fails if every handle is dropped first.
    pub fn run(mut self) -> Result<HostSummary, HostError> {
        let events = self.events.clone();
        let timers = self.timers.clone();
        let ticker = tick(self.frame_interval);
        info!(interval_ms = self.frame_interval.as_millis() as u64, "Host loop running");

        loop {
            select! {
                recv(events) -> msg => match msg {
                    Ok(HostEvent::Shutdown) => break,
                    Ok(event) => self.handle(event),
                    Err(_) => {
                        self.sequencer.stop();
                        return Err(HostError::Disconnected);
                    }
                },
                recv(timers) -> msg => {
                    if let Ok(token) = msg {
                        self.sequencer.on_timeout(token);
                    }
                },
                recv(ticker) -> _ => self.deliver_frame(),
            }
        }

        self.sequencer.stop();
        info!(
            frames = self.frames_delivered,
            triggers = self.triggers,
            "Host loop finished"
        );
        Ok(HostSummary {
            frames: self.frames_delivered,
            triggers: self.triggers,
            bpm: self.sequencer.bpm(),
            tracks: self.sequencer.tracks().to_vec(),
        })
    }

    fn deliver_frame(&mut self) {
        let Some(token) = self.frames.take_frame() else {
            return;
        };
        let fired = self.sequencer.on_frame(token);
        self.frames_delivered += 1;
        self.triggers += fired.len() as u64;
    }

    fn handle(&mut self, event: HostEvent) {
        let seq = &mut self.sequencer;
        match event {
            HostEvent::PointerDown { track, event } => seq.on_pointer_down(track, event),
            HostEvent::PointerMove(event) => seq.on_pointer_move(event),
            HostEvent::PointerUp(event) => seq.on_pointer_up(event),
            HostEvent::PointerCancel(pointer_id) => seq.on_pointer_cancel(pointer_id),
            HostEvent::PointerLeave => seq.on_pointer_leave(),
            HostEvent::UpdateParam { track, param } => seq.update_track_param(track, param),
            HostEvent::SelectTrack(track) => seq.set_selected_track(track),
            HostEvent::Play => seq.play(),
            HostEvent::Stop => seq.stop(),
            HostEvent::TogglePlay => seq.toggle_play(),
            HostEvent::SetBpm(bpm) => seq.set_bpm(bpm),
            HostEvent::CreateSession(count) => seq.create_session(count),
            HostEvent::Reset => seq.reset(),
            HostEvent::Snapshot(reply) => {
                if reply.send(seq.tracks().to_vec()).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            // Intercepted by `run`
            HostEvent::Shutdown => {}
        }
    }
}
