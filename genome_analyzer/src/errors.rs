// src/errors.rs

use std::time::Duration;

/// Failures surfaced to callers of the analysis service.
///
/// The `Display` text is what ends up in the `error` field of the JSON
/// envelope, so every message is written for the person using the UI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("sequence, interval, or variant is required")]
    MissingInput,

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid API key: {message}. Please check the AlphaGenome API key in Settings.")]
    InvalidCredential { message: String },

    #[error("The request was blocked by the model's safety filters ({reason}). Try a different sequence or region.")]
    ContentBlocked { reason: String },

    #[error("The AlphaGenome model is overloaded or the API quota is exhausted (gave up after {attempts} attempts). Wait a minute and try again, or use a different API key.")]
    ServiceOverloaded { attempts: u32, status: u16 },

    #[error("Python backend not running at {url}. Please start it with: cd python-backend && python main.py")]
    BackendUnavailable { url: String },

    #[error("{message}")]
    UpstreamError { message: String, status: Option<u16> },
}

impl AnalysisError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// HTTP status the route handler answers with for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingInput | Self::InvalidInput { .. } => 400,
            Self::InvalidCredential { .. } => 400,
            Self::ContentBlocked { .. } => 422,
            Self::ServiceOverloaded { status, .. } => *status,
            Self::BackendUnavailable { .. } => 503,
            Self::UpstreamError { status, .. } => match status {
                Some(code) if (400..600).contains(code) => *code,
                _ => 500,
            },
        }
    }
}

/// Low-level failure of a single outbound HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Other(String),
}
