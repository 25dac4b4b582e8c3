// src/error.rs

//! Unified error handling for the monitor.

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

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fetching an item from the source failed
    #[error("Fetch error for item {item}: {message}")]
    Fetch { item: String, message: String },

    /// Webhook answered with 429 Too Many Requests
    #[error("Webhook rate limited")]
    RateLimited,

    /// Webhook answered with a non-success status
    #[error("Webhook returned status {status}")]
    Webhook { status: u16 },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a specific item.
    pub fn fetch(item: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            item: item.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a rate-limit signal from the webhook.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Http(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
            _ => false,
        }
    }

    /// Whether this error means the file was simply not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
