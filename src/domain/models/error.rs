#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use thiserror::Error;

const TRANSIENT_STATUSES: [&str; 2] = ["RESOURCE_EXHAUSTED", "UNAVAILABLE"];
const TRANSIENT_MESSAGES: [&str; 3] = ["overloaded", "rate limit", "Service Unavailable"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Temporary, worth another attempt on the request/response path.
    Transient,
    Fatal,
}

/// A failure reported by the generative-content provider, or by the
/// transport while talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Provider status code such as `UNAVAILABLE`.
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, code: Option<&str>, message: &str) -> ProviderError {
        return ProviderError {
            status,
            code: code.map(|e| return e.to_string()),
            message: message.to_string(),
        };
    }

    pub fn transport(message: &str) -> ProviderError {
        return ProviderError::new(None, None, message);
    }

    /// Structured fields decide first; the message match only covers
    /// providers that report nothing else.
    pub fn kind(&self) -> ProviderErrorKind {
        if matches!(self.status, Some(429) | Some(503)) {
            return ProviderErrorKind::Transient;
        }

        if let Some(code) = &self.code {
            if TRANSIENT_STATUSES.contains(&code.as_str()) {
                return ProviderErrorKind::Transient;
            }
        }

        if TRANSIENT_MESSAGES
            .iter()
            .any(|needle| return self.message.contains(needle))
        {
            return ProviderErrorKind::Transient;
        }

        return ProviderErrorKind::Fatal;
    }

    pub fn is_transient(&self) -> bool {
        return self.kind() == ProviderErrorKind::Transient;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Gemini API Error: {0}")]
    Fatal(ProviderError),
    #[error("Gemini API Error: {0}")]
    RetriesExhausted(ProviderError),
    #[error("Gemini API Error: max retries exceeded")]
    MaxRetriesExceeded,
    #[error("Gemini streaming error: {0}")]
    Streaming(ProviderError),
    #[error("generation was cancelled")]
    Cancelled,
    #[error("history must contain at least one turn")]
    EmptyHistory,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Authentication(String),
    #[error("upload was rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("upload response did not include a file path")]
    MissingPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
