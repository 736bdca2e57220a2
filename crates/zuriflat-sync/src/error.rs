use thiserror::Error;

/// Failure of one remote call.
///
/// `Clone` so a single coalesced outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("JSON parse error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Transport failures and 5xx responses may succeed on a second attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Server { status, .. } => *status >= 500,
            ApiError::NotFound(_) | ApiError::Decode(_) => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
