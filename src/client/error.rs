use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Your session is missing or has expired")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
}

/// Why [`crate::client::Inbox::submit`] did not end with a confirmed message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Refused before anything was appended; the draft buffer is untouched.
    #[error(transparent)]
    Rejected(ClientError),
    /// The optimistic entry `local_id` stays in the thread marked `Failed`.
    #[error("{error}")]
    Undelivered { local_id: u64, error: ClientError },
}

impl SubmitError {
    /// The entry to pass to `retry_send` or `discard`, if one was appended.
    #[must_use]
    pub const fn local_id(&self) -> Option<u64> {
        match self {
            Self::Rejected(_) => None,
            Self::Undelivered { local_id, .. } => Some(*local_id),
        }
    }

    #[must_use]
    pub const fn error(&self) -> &ClientError {
        match self {
            Self::Rejected(error) | Self::Undelivered { error, .. } => error,
        }
    }
}

impl ClientError {
    /// Maps a failed response onto the error taxonomy. `message` is the body's `message` field, if any.
    #[must_use]
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                Self::Validation(message.unwrap_or_else(|| "Invalid request".to_string()))
            }
            StatusCode::CONFLICT => Self::Conflict(message.unwrap_or_else(|| "Conflict".to_string())),
            _ => Self::Server {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
