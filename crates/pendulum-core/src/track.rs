//! Track representation

use serde::{Deserialize, Serialize};

/// Track colours, cycled by index
pub const TRACK_COLORS: [&str; 8] = [
    "#4AE0B8", // mint
    "#E08D7F", // coral
    "#E0E04A", // yellow
    "#4AE04A", // green
    "#4ACCE0", // teal
    "#E04A4A", // red
    "#FFFFFF", // white
    "#4AE07F", // light green
];

pub const VOLUME_RANGE_DB: (f32, f32) = (-40.0, 0.0);
pub const SPEED_RANGE: (f64, f64) = (0.5, 4.0);
pub const ATTACK_RANGE: (f32, f32) = (0.01, 1.0);
pub const DECAY_RANGE: (f32, f32) = (0.1, 2.0);
pub const PITCH_RANGE: (f32, f32) = (-24.0, 24.0);
pub const TIME_SIGNATURE_RANGE: (u32, u32) = (1, 16);
pub const DELAY_TIME_RANGE: (f32, f32) = (0.0, 2.0);
pub const DELAY_FEEDBACK_RANGE: (f32, f32) = (0.0, 0.95);

/// Stable track identity, equal to the track's index in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub usize);

/// Which way a track is moving through the centre line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// Direction implied by a position: non-negative moves left-to-right
    pub fn from_position(position: f64) -> Self {
        if position < 0.0 {
            Self::RightToLeft
        } else {
            Self::LeftToRight
        }
    }
}

/// Percussive voices in the built-in kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    Kick,
    Snare,
    HiHat,
    Clap,
    Tom,
    Rim,
    Cowbell,
    Cymbal,
}

impl SampleKind {
    pub const ALL: [SampleKind; 8] = [
        Self::Kick,
        Self::Snare,
        Self::HiHat,
        Self::Clap,
        Self::Tom,
        Self::Rim,
        Self::Cowbell,
        Self::Cymbal,
    ];

    /// Default kit slot for a track index
    pub fn for_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Snare => "snare",
            Self::HiHat => "hihat",
            Self::Clap => "clap",
            Self::Tom => "tom",
            Self::Rim => "rim",
            Self::Cowbell => "cowbell",
            Self::Cymbal => "cymbal",
        }
    }
}

/// Per-track echo settings handed to the audio side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayParams {
    /// Echo time in seconds
    pub time: f32,
    pub feedback: f32,
    /// Dry/wet mix (0.0 dry to 1.0 wet)
    pub mix: f32,
}

impl DelayParams {
    pub fn clamped(self) -> Option<Self> {
        if !(self.time.is_finite() && self.feedback.is_finite() && self.mix.is_finite()) {
            return None;
        }
        Some(Self {
            time: self.time.clamp(DELAY_TIME_RANGE.0, DELAY_TIME_RANGE.1),
            feedback: self.feedback.clamp(DELAY_FEEDBACK_RANGE.0, DELAY_FEEDBACK_RANGE.1),
            mix: self.mix.clamp(0.0, 1.0),
        })
    }
}

/// User-supplied sample replacing the kit voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSample {
    /// Identifier the audio side resolves (file path, asset key, ...)
    pub id: String,
    /// Playback start offset in seconds
    pub start: f32,
}

/// One oscillating sequencer lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Signed offset from the centre line, bounded by `amplitude`
    pub position: f64,
    /// Peak displacement (0.0 = stationary)
    pub amplitude: f64,
    /// Oscillation rate multiplier
    pub speed: f64,
    /// Zero crossings consumed per trigger
    pub time_signature: u32,
    pub direction: Direction,
    pub oscillating: bool,
    pub is_dragging: bool,
    /// Clock time of the last fired trigger
    pub last_trigger_time: Option<f64>,
    pub sample: SampleKind,
    /// Volume in dB
    pub volume: f32,
    /// Attack in seconds
    pub attack: f32,
    /// Decay in seconds
    pub decay: f32,
    /// Pitch offset in semitones
    pub pitch: f32,
    pub delay: Option<DelayParams>,
    pub custom_sample: Option<CustomSample>,
    pub muted: bool,
    pub soloed: bool,
    pub color: String,
}

impl Track {
    /// Default lane for slot `index` of a fresh session
    pub fn new(index: usize) -> Self {
        Self {
            id: TrackId(index),
            position: 0.0,
            amplitude: 0.0,
            speed: (1.0 + index as f64 * 0.25).clamp(SPEED_RANGE.0, SPEED_RANGE.1),
            time_signature: 1,
            direction: Direction::LeftToRight,
            oscillating: false,
            is_dragging: false,
            last_trigger_time: None,
            sample: SampleKind::for_index(index),
            volume: -10.0,
            attack: 0.01,
            decay: 0.5,
            pitch: 0.0,
            delay: None,
            custom_sample: None,
            muted: false,
            soloed: false,
            color: TRACK_COLORS[index % TRACK_COLORS.len()].to_string(),
        }
    }

    /// Start or stop oscillation, keeping `direction` consistent with `position`
    pub fn set_oscillating(&mut self, oscillating: bool) {
        if oscillating {
            self.direction = Direction::from_position(self.position);
        }
        self.oscillating = oscillating;
    }

    /// Whether a crossing on this track may reach the sound collaborator
    pub fn is_audible(&self, any_soloed: bool) -> bool {
        !self.muted && (!any_soloed || self.soloed)
    }

    /// Return to the inert, centred state
    pub fn settle(&mut self) {
        self.oscillating = false;
        self.amplitude = 0.0;
        self.position = 0.0;
    }

    /// Apply a parameter edit, coercing it into the field's valid range.
    /// Non-finite numbers are ignored.
    pub fn apply(&mut self, param: TrackParam, max_amplitude: f64) {
        match param {
            TrackParam::Position(p) => {
                if p.is_finite() {
                    self.position = p.clamp(-self.amplitude, self.amplitude);
                }
            }
            TrackParam::Amplitude(a) => {
                if a.is_finite() {
                    self.amplitude = a.clamp(0.0, max_amplitude);
                    self.position = self.position.clamp(-self.amplitude, self.amplitude);
                }
            }
            TrackParam::Speed(s) => {
                if s.is_finite() {
                    self.speed = s.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
                }
            }
            TrackParam::TimeSignature(ts) => {
                self.time_signature = ts.clamp(TIME_SIGNATURE_RANGE.0, TIME_SIGNATURE_RANGE.1);
            }
            TrackParam::Direction(d) => self.direction = d,
            TrackParam::Oscillating(on) => {
                if !(on && self.is_dragging) {
                    self.set_oscillating(on);
                }
            }
            TrackParam::Sample(kind) => self.sample = kind,
            TrackParam::Volume(v) => {
                if v.is_finite() {
                    self.volume = v.clamp(VOLUME_RANGE_DB.0, VOLUME_RANGE_DB.1);
                }
            }
            TrackParam::Attack(a) => {
                if a.is_finite() {
                    self.attack = a.clamp(ATTACK_RANGE.0, ATTACK_RANGE.1);
                }
            }
            TrackParam::Decay(d) => {
                if d.is_finite() {
                    self.decay = d.clamp(DECAY_RANGE.0, DECAY_RANGE.1);
                }
            }
            TrackParam::Pitch(p) => {
                if p.is_finite() {
                    self.pitch = p.clamp(PITCH_RANGE.0, PITCH_RANGE.1);
                }
            }
            TrackParam::Delay(delay) => match delay {
                Some(params) => {
                    if let Some(params) = params.clamped() {
                        self.delay = Some(params);
                    }
                }
                None => self.delay = None,
            },
            TrackParam::CustomSample(sample) => {
                self.custom_sample = sample.map(|mut s| {
                    if !s.start.is_finite() || s.start < 0.0 {
                        s.start = 0.0;
                    }
                    s
                });
            }
            TrackParam::Muted(m) => self.muted = m,
            TrackParam::Soloed(s) => self.soloed = s,
            TrackParam::Color(c) => self.color = c,
        }
    }
}

/// A single editable track field with its new value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackParam {
    Position(f64),
    Amplitude(f64),
    Speed(f64),
    TimeSignature(u32),
    Direction(Direction),
    Oscillating(bool),
    Sample(SampleKind),
    Volume(f32),
    Attack(f32),
    Decay(f32),
    Pitch(f32),
    Delay(Option<DelayParams>),
    CustomSample(Option<CustomSample>),
    Muted(bool),
    Soloed(bool),
    Color(String),
}

/// Default track set for a session of `count` lanes
pub fn default_tracks(count: usize) -> Vec<Track> {
    (0..count).map(Track::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tracks() {
        let tracks = default_tracks(10);
        assert_eq!(tracks.len(), 10);
        assert_eq!(tracks[0].sample, SampleKind::Kick);
        assert_eq!(tracks[7].sample, SampleKind::Cymbal);
        assert_eq!(tracks[8].sample, SampleKind::Kick);
        assert_eq!(tracks[8].color, TRACK_COLORS[0]);
        assert_eq!(tracks[2].speed, 1.5);
        assert!(tracks.iter().all(|t| t.position == 0.0 && t.amplitude == 0.0 && !t.oscillating));
    }

    #[test]
    fn test_speed_default_is_clamped() {
        let track = Track::new(20);
        assert_eq!(track.speed, SPEED_RANGE.1);
    }

    #[test]
    fn test_set_oscillating_derives_direction() {
        let mut track = Track::new(0);
        track.amplitude = 1.0;
        track.position = -0.4;
        track.direction = Direction::LeftToRight;
        track.set_oscillating(true);
        assert_eq!(track.direction, Direction::RightToLeft);

        track.position = 0.0;
        track.set_oscillating(true);
        assert_eq!(track.direction, Direction::LeftToRight);
    }

    #[test]
    fn test_apply_clamps_into_range() {
        let mut track = Track::new(0);
        track.apply(TrackParam::Volume(12.0), 1.0);
        track.apply(TrackParam::Speed(-3.0), 1.0);
        track.apply(TrackParam::TimeSignature(0), 1.0);
        track.apply(TrackParam::Amplitude(-1.0), 1.0);
        assert_eq!(track.volume, 0.0);
        assert_eq!(track.speed, SPEED_RANGE.0);
        assert_eq!(track.time_signature, 1);
        assert_eq!(track.amplitude, 0.0);

        track.apply(TrackParam::Amplitude(5.0), 1.0);
        track.apply(TrackParam::Position(-3.0), 1.0);
        assert_eq!(track.amplitude, 1.0);
        assert_eq!(track.position, -1.0);
    }

    #[test]
    fn test_apply_ignores_non_finite() {
        let mut track = Track::new(0);
        track.apply(TrackParam::Speed(f64::NAN), 1.0);
        track.apply(TrackParam::Decay(f32::INFINITY), 1.0);
        assert_eq!(track.speed, 1.0);
        assert_eq!(track.decay, 0.5);
    }

    #[test]
    fn test_shrinking_amplitude_pulls_position_in() {
        let mut track = Track::new(0);
        track.apply(TrackParam::Amplitude(1.0), 1.0);
        track.apply(TrackParam::Position(0.8), 1.0);
        track.apply(TrackParam::Amplitude(0.5), 1.0);
        assert_eq!(track.position, 0.5);
    }

    #[test]
    fn test_cannot_oscillate_while_dragging() {
        let mut track = Track::new(0);
        track.is_dragging = true;
        track.apply(TrackParam::Oscillating(true), 1.0);
        assert!(!track.oscillating);
    }

    #[test]
    fn test_delay_is_clamped() {
        let mut track = Track::new(0);
        track.apply(
            TrackParam::Delay(Some(DelayParams { time: 5.0, feedback: 1.5, mix: -1.0 })),
            1.0,
        );
        assert_eq!(track.delay, Some(DelayParams { time: 2.0, feedback: 0.95, mix: 0.0 }));
    }

    #[test]
    fn test_audible_respects_mute_and_solo() {
        let mut track = Track::new(0);
        assert!(track.is_audible(false));
        assert!(!track.is_audible(true));
        track.soloed = true;
        assert!(track.is_audible(true));
        track.muted = true;
        assert!(!track.is_audible(true));
    }
}
