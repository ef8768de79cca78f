//! The sequencer facade: one owner for tracks, transport, gestures and the loop
//!
//! Every mutation of the track collection goes through this type. Gesture
//! effects, parameter edits and animation ticks each replace the affected
//! tracks wholesale, so the host never sees a half-applied update.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::animation::{AnimationLoop, RecentTriggers, TickReport, TriggerEvent};
use crate::config::{EngineConfig, MAX_TRACKS};
use crate::error::{PendulumError, Result};
use crate::gesture::{DragGestureMapper, GestureEffect};
use crate::host::{Clock, FrameScheduler, FrameToken, PointerEvent, SoundRequest, SoundTrigger, TimerToken};
use crate::oscillator::{PhaseState, TriggerDecision};
use crate::track::{default_tracks, Track, TrackId, TrackParam, SPEED_RANGE};
use crate::transport::Transport;

pub struct Sequencer {
    config: EngineConfig,
    tracks: Vec<Track>,
    selected: Option<TrackId>,
    transport: Transport,
    gestures: DragGestureMapper,
    animation: AnimationLoop,
    recent: RecentTriggers,
    clock: Box<dyn Clock>,
    sound: Box<dyn SoundTrigger>,
    scheduler: Box<dyn FrameScheduler>,
}

impl Sequencer {
    pub fn new(
        config: EngineConfig,
        clock: Box<dyn Clock>,
        sound: Box<dyn SoundTrigger>,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Result<Self> {
        config.validate()?;
        let session = &config.session;
        let transport = Transport::new(session.default_bpm, session.min_bpm, session.max_bpm);
        let tracks = default_tracks(session.track_count);
        info!(tracks = tracks.len(), bpm = transport.bpm(), "Session created");

        Ok(Self {
            tracks,
            selected: None,
            transport,
            gestures: DragGestureMapper::new(config.gesture.clone()),
            animation: AnimationLoop::new(config.animation.clone(), config.oscillator.clone()),
            recent: RecentTriggers::new(),
            clock,
            sound,
            scheduler,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of every track
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(PendulumError::TrackNotFound(id.0))
    }

    pub fn selected_track(&self) -> Option<TrackId> {
        self.selected
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    pub fn is_dragging(&self, id: TrackId) -> bool {
        self.gestures.is_dragging(id)
    }

    /// Tracks inside their trigger flash window
    pub fn recently_triggered(&self) -> BTreeSet<TrackId> {
        self.recent.ids()
    }

    pub fn phase_state(&self, id: TrackId) -> Option<&PhaseState> {
        self.animation.oscillator().phase_state(id)
    }

    /// Replace the track set with `track_count` default, non-oscillating tracks
    pub fn create_session(&mut self, track_count: usize) {
        let count = track_count.clamp(1, MAX_TRACKS);
        self.gestures.clear();
        self.animation.oscillator_mut().clear();
        self.recent.clear();
        self.tracks = default_tracks(count);
        if self.selected.is_some_and(|id| id.0 >= count) {
            self.selected = None;
        }
        info!(tracks = count, "Session created");
    }

    /// Stop the transport and rebuild the default session
    pub fn reset(&mut self) {
        self.stop();
        self.selected = None;
        self.create_session(self.config.session.track_count);
        info!("Session reset");
    }

    /// Edit one track field. Values are coerced into range; unknown tracks are ignored.
    pub fn update_track_param(&mut self, id: TrackId, param: TrackParam) {
        if let Err(e) = self.try_update_track_param(id, param) {
            debug!("Ignoring parameter edit: {}", e);
        }
    }

    pub fn try_update_track_param(&mut self, id: TrackId, param: TrackParam) -> Result<()> {
        let max_amplitude = self.config.gesture.max_amplitude;
        let reseed = matches!(
            param,
            TrackParam::Position(_) | TrackParam::Direction(_) | TrackParam::Oscillating(_)
        );
        let track = self.track_mut(id)?;
        track.apply(param, max_amplitude);
        if reseed {
            self.animation.oscillator_mut().forget(id);
        }
        Ok(())
    }

    /// Select a track for editing. Unknown ids are ignored.
    pub fn set_selected_track(&mut self, id: Option<TrackId>) {
        match id {
            Some(id) if self.track(id).is_none() => {}
            _ => self.selected = id,
        }
    }

    pub fn play(&mut self) {
        if self.transport.is_playing() {
            return;
        }
        self.transport.play();
        self.animation.start(self.scheduler.as_mut());
        info!(bpm = self.transport.bpm(), "Transport started");
    }

    pub fn stop(&mut self) {
        let was_playing = self.transport.is_playing();
        self.transport.stop();
        self.animation.stop(self.scheduler.as_mut());
        if was_playing {
            info!("Transport stopped");
        }
    }

    pub fn toggle_play(&mut self) {
        if self.transport.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.transport.set_bpm(bpm);
        debug!(bpm = self.transport.bpm(), "Tempo changed");
    }

    pub fn on_pointer_down(&mut self, id: TrackId, event: PointerEvent) {
        let Some(track) = self.tracks.iter().find(|t| t.id == id) else {
            return;
        };
        if let Some(effect) = self.gestures.pointer_down(track, event) {
            self.apply_gesture(effect);
        }
    }

    pub fn on_pointer_move(&mut self, event: PointerEvent) {
        if let Some(effect) = self.gestures.pointer_move(event) {
            self.apply_gesture(effect);
        }
    }

    pub fn on_pointer_up(&mut self, event: PointerEvent) {
        if let Some(effect) = self.gestures.pointer_up(event) {
            self.apply_gesture(effect);
        }
    }

    pub fn on_pointer_cancel(&mut self, pointer_id: u64) {
        if let Some(effect) = self.gestures.pointer_cancel(pointer_id) {
            self.apply_gesture(effect);
        }
    }

    /// Pointer left the surface: all drags end as releases
    pub fn on_pointer_leave(&mut self) {
        for effect in self.gestures.pointer_leave() {
            self.apply_gesture(effect);
        }
    }

    fn apply_gesture(&mut self, effect: GestureEffect) {
        let id = effect.track();
        let Ok(track) = self.track_mut(id) else {
            return;
        };

        match effect {
            GestureEffect::Grab { .. } => {
                track.is_dragging = true;
                track.oscillating = false;
            }
            GestureEffect::Stretch { amplitude, position, .. } => {
                track.amplitude = amplitude;
                track.position = position;
            }
            GestureEffect::Activate {
                amplitude,
                position,
                speed,
                ..
            } => {
                track.is_dragging = false;
                track.amplitude = amplitude;
                track.position = position;
                track.speed = speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
                track.set_oscillating(true);
                info!(track = id.0, amplitude, speed = track.speed, "Track oscillating");
            }
            GestureEffect::Release { was_oscillating, .. } => {
                track.is_dragging = false;
                track.settle();
                if was_oscillating {
                    info!(track = id.0, "Track oscillation cancelled");
                }
            }
        }

        // Phase restarts from the released position
        self.animation.oscillator_mut().forget(id);

        if matches!(effect, GestureEffect::Activate { .. }) && !self.transport.is_playing() {
            self.play();
        }
    }

    /// Deliver a requested display frame. Returns the triggers it fired.
    pub fn on_frame(&mut self, token: FrameToken) -> Vec<TriggerEvent> {
        let now = self.clock.now();
        let multiplier = self
            .transport
            .speed_multiplier(self.config.oscillator.reference_bpm);
        let Some(report) = self.animation.tick(
            token,
            now,
            &self.tracks,
            multiplier,
            self.scheduler.as_mut(),
        ) else {
            return Vec::new();
        };

        self.tracks = advance_snapshot(&self.tracks, &report);

        for trigger in &report.triggers {
            if let Some(track) = self.tracks.iter().find(|t| t.id == trigger.track) {
                self.sound.play(SoundRequest::for_track(track));
            }
        }

        let fired: Vec<TrackId> = report.triggers.iter().map(|t| t.track).collect();
        self.recent.mark(
            &fired,
            now,
            self.config.animation.flash_secs,
            self.scheduler.as_mut(),
        );
        report.triggers
    }

    /// Deliver an elapsed flash timer
    pub fn on_timeout(&mut self, token: TimerToken) {
        let now = self.clock.now();
        self.recent.expire(token, now);
    }
}

/// The track set after applying one tick's motion updates
fn advance_snapshot(tracks: &[Track], report: &TickReport) -> Vec<Track> {
    tracks
        .iter()
        .map(|track| {
            let Some(update) = report.updates.iter().find(|u| u.track == track.id) else {
                return track.clone();
            };
            let mut next = track.clone();
            next.position = update.position;
            next.direction = update.direction;
            if update.decision == TriggerDecision::Fire {
                next.last_trigger_time = Some(report.now);
            }
            next
        })
        .collect()
}
