//! Tweener error types

use thiserror::Error;

/// Errors raised by the scheduling API and its configuration surface
///
/// Only configuration problems surface here. Failing lifecycle callbacks and
/// tweens on absent properties are logged and never turned into errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// The engine was asked to start without a frame ticker
    #[error("No frame ticker configured: call set_frame_ticker() before adding tweens")]
    MissingTicker,

    /// A scheduling parameter has the wrong type or an out-of-range value
    #[error("Invalid tween parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TweenError {
    /// Shorthand for [`TweenError::InvalidParameter`]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TweenError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for tweener operations
pub type Result<T> = std::result::Result<T, TweenError>;
