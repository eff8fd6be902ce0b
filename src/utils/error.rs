use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error came from the HTTP transport itself.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Http(_))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
