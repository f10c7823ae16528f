//! Error taxonomy for scene requests.
//!
//! Every failure a caller can see is one of these variants. They are kept
//! distinct because the corrective action differs: wait and retry, pick
//! another hour, pick another channel, or report a broken file.

use thiserror::Error;

/// Result type alias using SceneError.
pub type SceneResult<T> = Result<T, SceneError>;

/// Primary error type for scene requests.
#[derive(Debug, Error)]
pub enum SceneError {
    // === Discovery Errors ===
    #[error("Storage backend unreachable for {prefix}: {message}")]
    BackendUnreachable { prefix: String, message: String },

    #[error("No objects found under {prefix}")]
    EmptyIndex { prefix: String },

    #[error("No object for channel {channel} under {prefix} ({listed} objects listed)")]
    NoChannelMatch {
        channel: String,
        prefix: String,
        listed: usize,
    },

    #[error("No data for channel {channel} in the last {hours} hours")]
    LookbackExhausted { channel: String, hours: usize },

    // === Decode Errors ===
    #[error("Failed to decode {identifier}: {message}")]
    DecodeFailure { identifier: String, message: String },

    // === Caller Errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SceneError {
    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            SceneError::BackendUnreachable { .. } => "backend_unreachable",
            SceneError::EmptyIndex { .. } => "empty_index",
            SceneError::NoChannelMatch { .. } => "no_channel_match",
            SceneError::LookbackExhausted { .. } => "lookback_exhausted",
            SceneError::DecodeFailure { .. } => "decode_failure",
            SceneError::InvalidRequest(_) => "invalid_request",
            SceneError::Config(_) => "config",
        }
    }

    /// Corrective action to show the user.
    pub fn guidance(&self) -> &'static str {
        match self {
            SceneError::BackendUnreachable { .. } => {
                "The data archive could not be reached. Wait a few minutes and retry."
            }
            SceneError::EmptyIndex { .. } => {
                "Nothing has been published for that hour yet. Pick an earlier hour."
            }
            SceneError::NoChannelMatch { .. } => {
                "That channel is missing for the requested hour. Pick another channel or hour."
            }
            SceneError::LookbackExhausted { .. } => {
                "No recent imagery is available. Try again in 5 minutes."
            }
            SceneError::DecodeFailure { .. } => {
                "The scene was found but could not be read. Retry, or pick another hour."
            }
            SceneError::InvalidRequest(_) => "Check the requested channel, date, hour and region.",
            SceneError::Config(_) => "Check the scene configuration file.",
        }
    }

    /// Whether the failure happened before a scene was chosen.
    pub fn is_discovery_failure(&self) -> bool {
        matches!(
            self,
            SceneError::BackendUnreachable { .. }
                | SceneError::EmptyIndex { .. }
                | SceneError::NoChannelMatch { .. }
                | SceneError::LookbackExhausted { .. }
        )
    }

    pub fn decode(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        SceneError::DecodeFailure {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}
