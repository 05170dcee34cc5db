//! Error types for image editing.

/// Message shown for empty or malformed responses.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate image";

/// Maximum length of an API error body kept in [`EditError::Api`].
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while editing an image.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// No API credential configured.
    #[error("{0}")]
    Configuration(String),

    /// The exchange returned no usable result.
    #[error("{0}")]
    EmptyResponse(String),

    /// The first candidate carried no content parts.
    #[error("{0}")]
    MalformedResponse(String),

    /// The model answered with text instead of an image (safety refusal,
    /// clarification request). Holds the model's text verbatim.
    #[error("Gemini API response: {0}")]
    Refusal(String),

    /// The input file could not be read.
    #[error("failed to read file: {0}")]
    Read(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditError {
    /// Returns true for the empty/malformed response pair, which front ends
    /// report with the same generic failure message.
    pub fn is_response_error(&self) -> bool {
        matches!(self, Self::EmptyResponse(_) | Self::MalformedResponse(_))
    }

    /// Returns the message to show the user.
    ///
    /// Empty and malformed responses share [`GENERIC_FAILURE_MESSAGE`]; every
    /// other error shows its display text.
    pub fn user_message(&self) -> String {
        if self.is_response_error() {
            return GENERIC_FAILURE_MESSAGE.to_string();
        }
        self.to_string()
    }

    /// Returns the model-provided explanation for a refusal.
    pub fn refusal_text(&self) -> Option<&str> {
        match self {
            Self::Refusal(text) => Some(text),
            _ => None,
        }
    }
}

/// Collapses whitespace in an API error body and caps its length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// Result type alias for image editing operations.
pub type Result<T> = std::result::Result<T, EditError>;
