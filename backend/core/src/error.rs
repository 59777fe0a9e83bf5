use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProviderKind;

/// Serializable tag for each error family, carried in `PipelineResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Capture,
    OcrExhausted,
    Auth,
    RateLimit,
    Protocol,
    Timeout,
    Channel,
    Transport,
    Upstream,
    InvalidInput,
    Settings,
    Internal,
}

/// Screen capture or crop failure. Terminal for the run, never retried.
///
/// Displays the bare message so the UI shows exactly what the platform said.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    OutOfBounds(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Encoding(String),
}

/// A single OCR provider's failure. Logged, then the chain advances.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrProviderError {
    #[error("{provider}: request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider}: returned {status}: {message}")]
    Upstream {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider}: {message}")]
    Processing { provider: String, message: String },

    #[error("{provider}: timed out after {}ms", .after.as_millis())]
    Timeout { provider: String, after: Duration },

    #[error("{provider}: provider task aborted: {message}")]
    Aborted { provider: String, message: String },
}

impl OcrProviderError {
    pub fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn processing(provider: &str, message: impl Into<String>) -> Self {
        Self::Processing {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// AI backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// Missing or rejected credential. Never retried.
    #[error("{provider}: {credential} is missing or invalid ({detail})")]
    Auth {
        provider: ProviderKind,
        credential: String,
        detail: String,
    },

    /// HTTP 429 on every attempt.
    #[error("{provider}: rate limit exceeded after {attempts} attempts, please wait a few minutes and try again")]
    RateLimit { provider: ProviderKind, attempts: u32 },

    /// The response body did not have the expected envelope.
    #[error("{provider}: malformed response: {detail}")]
    Protocol { provider: ProviderKind, detail: String },

    #[error("{provider}: request failed: {detail}")]
    Transport { provider: ProviderKind, detail: String },

    #[error("{provider}: returned {status}: {message}")]
    Upstream {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no backend registered for provider {0}")]
    UnknownProvider(ProviderKind),

    #[error("{provider}: backend task aborted: {detail}")]
    Internal { provider: ProviderKind, detail: String },
}

impl AiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::UnknownProvider(_) => ErrorKind::Settings,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn protocol(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::Protocol {
            provider,
            detail: detail.into(),
        }
    }

    pub fn transport(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            detail: detail.into(),
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }
}

/// Run-level failure that ends a pipeline in `Done(failure)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("no text could be recognized in the selection: {0}")]
    OcrExhausted(String),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("no AI response within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Capture(_) => ErrorKind::Capture,
            Self::OcrExhausted(_) => ErrorKind::OcrExhausted,
            Self::Ai(e) => e.kind(),
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Channel(_) => ErrorKind::Channel,
            Self::Settings(_) => ErrorKind::Settings,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_displays_verbatim() {
        let err = PipelineError::from(CaptureError::PermissionDenied("permission denied".into()));
        assert_eq!(err.to_string(), "permission denied");
        assert_eq!(err.kind(), ErrorKind::Capture);
    }

    #[test]
    fn test_ai_error_kinds_pass_through() {
        let err = PipelineError::from(AiError::RateLimit {
            provider: ProviderKind::Gemini,
            attempts: 4,
        });
        assert_eq!(err.kind(), ErrorKind::RateLimit);

        let err = PipelineError::from(AiError::Auth {
            provider: ProviderKind::Groq,
            credential: "Groq API key".into(),
            detail: "HTTP 401".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.to_string().contains("Groq API key"));
    }

    #[test]
    fn test_timeout_message() {
        let err = PipelineError::Timeout(Duration::from_secs(15));
        assert_eq!(err.to_string(), "no AI response within 15000ms");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
