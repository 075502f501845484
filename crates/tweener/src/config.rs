//! Engine configuration file handling (tweener.toml)

use crate::easing::Easing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tweener_core::{Result, TweenError};

/// Engine-wide settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TweenerConfig {
    /// Divides every `time` and `delay`
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    /// Used when a tween names no transition or an unknown one
    #[serde(default = "default_transition")]
    pub default_transition: String,
    /// Frames per second of the built-in frame ticker
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_transition() -> String {
    Easing::EaseOutExpo.name().to_string()
}

fn default_frame_rate() -> f64 {
    65.0
}

impl Default for TweenerConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            default_transition: default_transition(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl TweenerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TweenError::Config(e.to_string()))
    }

    /// Load configuration from a file, or from `tweener.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join("tweener.toml")
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            TweenError::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            TweenError::Config(reason) => TweenError::Config(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                reason
            )),
            other => other,
        })
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TweenError::Config(e.to_string()))
    }

    /// The configured default transition
    pub fn default_transition(&self) -> Result<Easing> {
        self.default_transition.parse().map_err(|_| {
            TweenError::Config(format!(
                "Unknown default transition `{}`",
                self.default_transition
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TweenerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TweenerConfig::default());
        assert_eq!(config.default_transition().unwrap(), Easing::EaseOutExpo);
    }

    #[test]
    fn test_config_overrides() {
        let config = TweenerConfig::from_toml_str(
            r#"
            time_scale = 0.5
            default_transition = "easeInOutSine"
            frame_rate = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.time_scale, 0.5);
        assert_eq!(config.frame_rate, 30.0);
        assert_eq!(config.default_transition().unwrap(), Easing::EaseInOutSine);
    }

    #[test]
    fn test_unknown_transition_is_a_config_error() {
        let config = TweenerConfig::from_toml_str(r#"default_transition = "zigzag""#).unwrap();
        assert!(matches!(config.default_transition(), Err(TweenError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_a_config_error() {
        let err = TweenerConfig::from_toml_str("time_scale = ").unwrap_err();
        assert!(matches!(err, TweenError::Config(_)));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = TweenerConfig {
            time_scale: 2.0,
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(TweenerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TweenerConfig::load(Path::new("/nonexistent/tweener.toml")).unwrap_err();
        assert!(matches!(err, TweenError::Config(_)));
    }
}
