//! Transport state and controls

use serde::{Deserialize, Serialize};

/// Transport playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// Global play state and tempo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub state: TransportState,
    /// Tempo in BPM
    bpm: f64,
    min_bpm: f64,
    max_bpm: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            state: TransportState::Stopped,
            bpm: 120.0,
            min_bpm: 40.0,
            max_bpm: 240.0,
        }
    }
}

impl Transport {
    pub fn new(bpm: f64, min_bpm: f64, max_bpm: f64) -> Self {
        let mut transport = Self {
            min_bpm,
            max_bpm,
            ..Default::default()
        };
        transport.set_bpm(bpm);
        transport
    }

    pub fn play(&mut self) {
        self.state = TransportState::Playing;
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set tempo, clamped to the configured range. Non-finite values are ignored.
    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm.is_finite() {
            self.bpm = bpm.clamp(self.min_bpm, self.max_bpm);
        }
    }

    /// Global speed multiplier relative to `reference_bpm`
    pub fn speed_multiplier(&self, reference_bpm: f64) -> f64 {
        self.bpm / reference_bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpm_is_clamped() {
        let mut transport = Transport::new(120.0, 40.0, 240.0);
        transport.set_bpm(500.0);
        assert_eq!(transport.bpm(), 240.0);
        transport.set_bpm(1.0);
        assert_eq!(transport.bpm(), 40.0);
        transport.set_bpm(f64::NAN);
        assert_eq!(transport.bpm(), 40.0);
    }

    #[test]
    fn test_speed_multiplier() {
        let transport = Transport::new(180.0, 40.0, 240.0);
        assert_eq!(transport.speed_multiplier(120.0), 1.5);
    }

    #[test]
    fn test_play_stop() {
        let mut transport = Transport::default();
        assert!(!transport.is_playing());
        transport.play();
        assert!(transport.is_playing());
        transport.stop();
        assert_eq!(transport.state, TransportState::Stopped);
    }
}
