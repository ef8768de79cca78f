//! Deterministic host doubles shared by the engine's unit tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::animation::TriggerEvent;
use crate::config::EngineConfig;
use crate::host::{Clock, FrameScheduler, FrameToken, PointerEvent, SoundRequest, SoundTrigger, TimerToken};
use crate::sequencer::Sequencer;
use crate::track::TrackId;

/// Clock advanced by hand
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn advance(&self, secs: f64) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

/// Records every sound request
#[derive(Debug, Clone, Default)]
pub struct RecordingSound(Rc<RefCell<Vec<SoundRequest>>>);

impl RecordingSound {
    pub fn played(&self) -> Vec<SoundRequest> {
        self.0.borrow().clone()
    }

    pub fn count_for(&self, track: TrackId) -> usize {
        self.0.borrow().iter().filter(|r| r.track == track).count()
    }
}

impl SoundTrigger for RecordingSound {
    fn play(&mut self, request: SoundRequest) {
        self.0.borrow_mut().push(request);
    }
}

#[derive(Debug, Default)]
struct SchedulerLog {
    next_token: u64,
    frames: Vec<FrameToken>,
    cancelled: Vec<FrameToken>,
    /// (token, due time)
    timers: Vec<(TimerToken, f64)>,
}

/// Frame and timer requests held until the test delivers them
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    log: Rc<RefCell<SchedulerLog>>,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            log: Rc::default(),
        }
    }

    /// Oldest outstanding frame request, removed as if delivered
    pub fn take_frame(&self) -> Option<FrameToken> {
        let mut log = self.log.borrow_mut();
        if log.frames.is_empty() {
            None
        } else {
            Some(log.frames.remove(0))
        }
    }

    pub fn outstanding_frames(&self) -> usize {
        self.log.borrow().frames.len()
    }

    pub fn cancelled(&self) -> Vec<FrameToken> {
        self.log.borrow().cancelled.clone()
    }

    pub fn take_timers(&self) -> Vec<(TimerToken, f64)> {
        std::mem::take(&mut self.log.borrow_mut().timers)
    }

    /// Remove and return the timers due at or before `now`
    pub fn take_due_timers(&self, now: f64) -> Vec<TimerToken> {
        let mut log = self.log.borrow_mut();
        let (due, pending): (Vec<_>, Vec<_>) = log.timers.drain(..).partition(|(_, at)| *at <= now);
        log.timers = pending;
        due.into_iter().map(|(token, _)| token).collect()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameToken {
        let mut log = self.log.borrow_mut();
        log.next_token += 1;
        let token = FrameToken(log.next_token);
        log.frames.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        let mut log = self.log.borrow_mut();
        log.frames.retain(|t| *t != token);
        log.cancelled.push(token);
    }

    fn schedule_timeout(&mut self, delay_secs: f64) -> TimerToken {
        let due = self.clock.now() + delay_secs;
        let mut log = self.log.borrow_mut();
        log.next_token += 1;
        let token = TimerToken(log.next_token);
        log.timers.push((token, due));
        token
    }
}

/// A sequencer wired to manual doubles
pub struct Harness {
    pub sequencer: Sequencer,
    pub clock: ManualClock,
    pub sound: RecordingSound,
    pub scheduler: ManualScheduler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let clock = ManualClock::new(100.0);
        let sound = RecordingSound::default();
        let scheduler = ManualScheduler::new(clock.clone());
        let sequencer = Sequencer::new(
            config,
            Box::new(clock.clone()),
            Box::new(sound.clone()),
            Box::new(scheduler.clone()),
        )
        .expect("valid test config");
        Self {
            sequencer,
            clock,
            sound,
            scheduler,
        }
    }

    /// Advance the clock, fire due timers, then deliver the pending frame
    pub fn frame(&mut self, dt: f64) -> Vec<TriggerEvent> {
        self.clock.advance(dt);
        for token in self.scheduler.take_due_timers(self.clock.now()) {
            self.sequencer.on_timeout(token);
        }
        match self.scheduler.take_frame() {
            Some(token) => self.sequencer.on_frame(token),
            None => Vec::new(),
        }
    }

    /// Run frames of `dt` for `secs` seconds, collecting every trigger
    pub fn run_for(&mut self, secs: f64, dt: f64) -> Vec<TriggerEvent> {
        let frames = (secs / dt).round() as usize;
        (0..frames).flat_map(|_| self.frame(dt)).collect()
    }

    /// Press on `track` at `x`, move to `x + dx` and release there
    pub fn drag(&mut self, track: TrackId, x: f64, dx: f64) {
        let t = self.clock.now();
        self.sequencer.on_pointer_down(track, PointerEvent::new(7, x, 0.0, t));
        self.sequencer.on_pointer_move(PointerEvent::new(7, x + dx, 0.0, t + 0.1));
        self.sequencer.on_pointer_up(PointerEvent::new(7, x + dx, 0.0, t + 0.15));
    }
}
