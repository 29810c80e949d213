// src/error.rs

//! Unified error handling for the site monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Page could not be retrieved
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Rendering session could not be obtained or used
    #[error("Render error: {0}")]
    Render(String),

    /// Notification transport failed
    #[error("Notification error ({transport}): {message}")]
    Notify { transport: String, message: String },

    /// Site key is not part of the configured roster
    #[error("Unknown site: {0}")]
    UnknownSite(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a rendering error.
    pub fn render(message: impl fmt::Display) -> Self {
        Self::Render(message.to_string())
    }

    /// Create a notification error for a transport.
    pub fn notify(transport: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            transport: transport.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message() {
        let err = AppError::fetch("https://example.com/blog/", "timed out");
        assert_eq!(
            err.to_string(),
            "Fetch error for https://example.com/blog/: timed out"
        );
    }

    #[test]
    fn test_status_error_message() {
        let err = AppError::HttpStatus {
            url: "https://example.com".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 for https://example.com");
    }
}
