use std::path::PathBuf;

use pendulum_core::EngineConfig;
use tracing::{debug, warn};

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pendulum")
        .join("config.toml")
}

pub(crate) fn parse_config(text: &str) -> Result<EngineConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Engine settings from the user's config file, or defaults when it is
/// missing or unreadable
pub(crate) fn load_config() -> EngineConfig {
    let path = config_path();
    let Ok(text) = std::fs::read_to_string(&path) else {
        debug!(path = %path.display(), "No config file, using defaults");
        return EngineConfig::default();
    };
    match parse_config(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), "Ignoring malformed config: {}", e);
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").ok(), Some(EngineConfig::default()));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = parse_config("[session]\ntrack_count = 3\n\n[animation]\nflash_secs = 0.5\n")
            .expect("valid toml");
        assert_eq!(config.session.track_count, 3);
        assert_eq!(config.session.default_bpm, 120.0);
        assert_eq!(config.animation.flash_secs, 0.5);
        assert_eq!(config.gesture, EngineConfig::default().gesture);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(parse_config("[session\ntrack_count = ").is_err());
        assert!(parse_config("[session]\ntrack_count = \"many\"").is_err());
    }

    #[test]
    fn test_path_is_under_app_dir() {
        let path = config_path();
        assert!(path.ends_with("pendulum/config.toml"));
    }
}
