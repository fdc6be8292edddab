use thiserror::Error;

use crate::phase::Phase;

/// Synchronous failures raised before any connection is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please enter a YouTube URL")]
    EmptyUrl,

    #[error("Invalid YouTube URL: {url}")]
    InvalidUrl { url: String },

    #[error("No video submitted yet")]
    NoVideo,

    #[error("{phase} requires the result of {requires}")]
    MissingPrerequisite { phase: Phase, requires: Phase },

    #[error("{phase} is still running")]
    PhaseInFlight { phase: Phase },

    #[error("No quiz available")]
    NoQuiz,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("Failed to send request: {0}")]
    SendFailed(String),

    #[error("Connection broken: {0}")]
    ReceiveFailed(String),
}

#[derive(Error, Debug)]
pub enum KonspektError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, KonspektError>;
