//! Error types for pendulum

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PendulumError {
    #[error("Track not found: {0}")]
    TrackNotFound(usize),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PendulumError>;
