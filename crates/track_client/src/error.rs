use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },
    /// Rejected locally before anything was sent.
    #[error("invalid input: {0}")]
    Validation(String),
    /// A trackout mutation was attempted without a loaded track.
    #[error("invalid state: {0}")]
    State(String),
    #[error("unexpected response body: {0}")]
    UnexpectedResponse(String),
}

impl TrackError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.status().map(ErrorCode::from_status)
    }

    /// Text recorded in the store's `error` field.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for TrackError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::server(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::UnexpectedResponse(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnexpectedResponse(err.to_string())
    }
}
