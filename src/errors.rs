// errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Feed request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Feed parsing error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Feed is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("Feed too large: {size} bytes")]
    FeedTooLarge { size: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("Unrecognised date format: '{0}'")]
    UnrecognisedFormat(String),

    #[error("Local time '{time}' cannot be placed in {zone}")]
    Unrepresentable { time: String, zone: String },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Desktop notification failed: {0}")]
    Desktop(String),

    #[error("Notification task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Poll interval must be at least {min} seconds, got {got}")]
    PollIntervalTooShort { min: u64, got: u64 },

    #[error("Request timeout must be at least 1 second")]
    TimeoutTooShort,

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}
