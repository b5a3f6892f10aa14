use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to project issue {key}: {message}")]
    Projection { key: String, message: String },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Encoding(format!("CSV: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
