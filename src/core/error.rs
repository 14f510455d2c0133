use thiserror::Error;

/// Failures recorded by a refresh session.
///
/// None of these escape the controller: they are stored as the session's
/// `last_error` and, for manual refreshes, shown through the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    #[error("Payload could not be compared: {message}")]
    Comparison { message: String },

    #[error("No signed-in user; refresh skipped")]
    MissingIdentity,

    #[error("Session has been torn down")]
    Stopped,
}

impl RefreshError {
    pub fn fetch(error: &anyhow::Error) -> Self {
        RefreshError::Fetch {
            message: format!("{error:#}"),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RefreshError::Fetch { .. } => "FETCH_FAILED",
            RefreshError::Comparison { .. } => "COMPARISON_FAILED",
            RefreshError::MissingIdentity => "MISSING_IDENTITY",
            RefreshError::Stopped => "SESSION_STOPPED",
        }
    }

    /// Caller-misuse conditions, as opposed to transport or payload problems.
    pub fn is_user_error(&self) -> bool {
        matches!(self, RefreshError::MissingIdentity | RefreshError::Stopped)
    }
}
