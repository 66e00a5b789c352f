//! Error handling for curlkit

use thiserror::Error;

/// Main error type for curlkit operations
#[derive(Error, Debug)]
pub enum CurlError {
    #[error("Transfer engine unavailable: {0}")]
    ExtensionUnavailable(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Unknown authentication type: {0}")]
    UnknownAuthType(String),

    #[error("Invalid value for option {option}: expected {expected}")]
    InvalidOptionValue {
        option: &'static str,
        expected: &'static str,
    },

    /// The engine failed to complete the transfer. `code` uses curl's numbering.
    #[error("Transfer failed ({code}): {message}")]
    Transport { code: i32, message: String },

    #[error("No open session; call start() before issuing another request")]
    NoSession,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl CurlError {
    pub fn transport(code: i32, message: impl Into<String>) -> Self {
        CurlError::Transport {
            code,
            message: message.into(),
        }
    }

    /// The HTTP client could not be set up for a session (curl's FAILED_INIT).
    pub(crate) fn client_init(err: reqwest::Error) -> Self {
        CurlError::transport(
            2,
            format!("Failed to initialize HTTP client: {}", error_chain(&err)),
        )
    }
}

impl From<reqwest::Error> for CurlError {
    fn from(err: reqwest::Error) -> Self {
        let code = transport_code(&err);
        CurlError::Transport {
            code,
            message: error_chain(&err),
        }
    }
}

fn transport_code(err: &reqwest::Error) -> i32 {
    if err.is_timeout() {
        return 28;
    }
    if err.is_redirect() {
        return 47;
    }
    if err.is_connect() {
        let chain = error_chain(err).to_ascii_lowercase();
        if chain.contains("dns") || chain.contains("resolve") {
            return 6;
        }
        return 7;
    }
    if err.is_builder() {
        return 43;
    }
    if err.is_decode() {
        return 61;
    }
    56
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type alias for curlkit operations
pub type Result<T> = std::result::Result<T, CurlError>;
