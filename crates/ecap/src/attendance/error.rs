//! Error types for the attendance subsystem.

use thiserror::Error;

/// Why a login attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LoginFailure {
    /// The portal showed a known failure marker (error banner, login form, ...)
    BadCredentials,
    /// The response matched neither success nor any known failure marker
    UnexpectedResponse,
}

/// Errors that can occur while scraping attendance.
#[derive(Debug, Error, Clone)]
pub enum AttendanceError {
    /// Transport failure: timeout, DNS, refused connection, bad status
    #[error("Network error: {message}")]
    Network { message: String },

    /// The portal rejected the login or answered with something unrecognized
    #[error("Authentication failed: {message}")]
    Authentication { reason: LoginFailure, message: String },

    /// A fetch was attempted on a session without a verified login
    #[error("Not authenticated: {message}")]
    NotAuthenticated { message: String },

    /// The markup did not match the expected structure
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    Url { message: String },

    /// The portal configuration is unusable
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl AttendanceError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        AttendanceError::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        AttendanceError::Config {
            message: message.into(),
        }
    }

    /// Returns true if this error is transient and the same request may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttendanceError::Network { .. })
    }

    /// Returns true if the user has to supply credentials (again).
    pub fn needs_credentials(&self) -> bool {
        matches!(
            self,
            AttendanceError::Authentication { .. } | AttendanceError::NotAuthenticated { .. }
        )
    }

    /// Returns true if the error points at a portal layout change or a broken setup.
    pub fn needs_maintainer(&self) -> bool {
        matches!(
            self,
            AttendanceError::Parse { .. } | AttendanceError::Config { .. } | AttendanceError::Url { .. }
        )
    }

    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AttendanceError::Network { .. } => {
                "Could not reach the portal. Please try again in a moment.".to_string()
            }
            AttendanceError::Authentication {
                reason: LoginFailure::BadCredentials,
                message,
            } => format!("Login failed: {message}. Please check your credentials and try again."),
            AttendanceError::Authentication {
                reason: LoginFailure::UnexpectedResponse,
                ..
            } => "Login failed: the portal returned an unexpected page. Please try again later."
                .to_string(),
            AttendanceError::NotAuthenticated { message } => {
                format!("{message}. Please send your credentials again.")
            }
            AttendanceError::Parse { .. } => {
                "Failed to read attendance data; the portal layout may have changed.".to_string()
            }
            AttendanceError::Url { .. } | AttendanceError::Config { .. } => {
                "The scraper is misconfigured.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for AttendanceError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: it may carry query parameters we don't want echoed to users.
        AttendanceError::Network {
            message: err.without_url().to_string(),
        }
    }
}

impl From<url::ParseError> for AttendanceError {
    fn from(err: url::ParseError) -> Self {
        AttendanceError::Url {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AttendanceError {
    fn from(err: std::io::Error) -> Self {
        AttendanceError::Config {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AttendanceError {
    fn from(err: serde_json::Error) -> Self {
        AttendanceError::Config {
            message: err.to_string(),
        }
    }
}
