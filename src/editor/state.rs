//! Editor status and action outcomes.

/// Status of the current editing session.
///
/// Only `Error` carries a message, so an error can never be shown while idle
/// or processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditStatus {
    /// No request in flight.
    #[default]
    Idle,
    /// One edit request is outstanding.
    Processing,
    /// The last edit was applied.
    Success,
    /// The last edit failed.
    Error {
        /// Human-readable failure message.
        message: String,
    },
}

impl EditStatus {
    /// Returns true while an edit request is outstanding.
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Returns the error message, if the last edit failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error { .. } => "error",
        }
    }
}

impl std::fmt::Display for EditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error { message } => write!(f, "error: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

/// How a finished edit request was reconciled into the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The new image replaced the current one.
    Applied,
    /// The request failed; the session is in the `Error` state.
    Failed {
        /// Message now shown to the user.
        message: String,
    },
    /// The session the request belonged to is gone; the result was ignored.
    Dropped,
}

/// Result of offering a file to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A new session was started.
    Accepted,
    /// The file was refused; the message is meant for the user.
    Rejected {
        /// Why the file was refused.
        message: String,
    },
}
