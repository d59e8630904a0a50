use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// External service an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Elasticsearch,
    Appeears,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elasticsearch => f.write_str("Elasticsearch"),
            Self::Appeears => f.write_str("AppEEARS"),
        }
    }
}

/// Where a failure came from, as reported to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    Transport,
    Remote,
    Validation,
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} error: {message}")]
    Remote {
        service: Service,
        status: Option<u16>,
        message: String,
    },

    #[error("{message}")]
    Authentication { service: Service, message: String },

    #[error("{service} returned malformed JSON: {source}")]
    Decode {
        service: Service,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn remote(service: Service, message: impl Into<String>) -> Self {
        Self::Remote {
            service,
            status: None,
            message: message.into(),
        }
    }

    pub fn status(service: Service, status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self::Remote {
            service,
            status: Some(status),
            message,
        }
    }

    pub const fn transport(service: Service, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Transport { .. } | Self::Io(_) => ErrorOrigin::Transport,
            Self::Remote { .. } | Self::Authentication { .. } | Self::Decode { .. } => {
                ErrorOrigin::Remote
            }
            Self::InvalidInput(_) | Self::Configuration(_) => ErrorOrigin::Validation,
        }
    }

    /// HTTP status reported by the service, when there was one.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

/// Rejects blank required identifiers; returns the trimmed value.
pub(crate) fn require<'a>(field: &str, value: &'a str) -> AdapterResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AdapterError::invalid(format!("{field} is required")));
    }
    Ok(trimmed)
}
