//! Error types for passage.
//!
//! One unified error type with explicit variants for validation, transport,
//! server-rejected, authorization and storage failures. Every variant can be
//! rendered as a single display message for the user via
//! [`Error::display_message`].

use std::fmt;
use thiserror::Error;

/// The unified error type for passage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Network transport errors (connection, timeout, malformed response).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status or envelope.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// Authorization could not be established or renewed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The token store could not be written or cleared.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Human-readable message suitable for showing to the user.
    ///
    /// Prefers the message supplied by the server, falling back to the
    /// error's own description.
    pub fn display_message(&self) -> String {
        match self {
            Error::Server(ServerError {
                message: Some(message),
                ..
            }) => message.clone(),
            Error::Auth(AuthError::RefreshRejected {
                message: Some(message),
            }) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true if the server rejected the request with HTTP 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Server(e) if e.is_unauthorized())
    }

    /// Returns the HTTP status for server-rejected errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server(e) => Some(e.status),
            _ => None,
        }
    }
}

/// Validation errors, raised before a request leaves the process.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Email missing or malformed.
    #[error("invalid email '{value}': {reason}")]
    Email { value: String, reason: String },

    /// Password missing or too short. The value is never included.
    #[error("invalid password: {reason}")]
    Password { reason: String },

    /// A required name field is blank.
    #[error("{field} must not be blank")]
    Name { field: &'static str },

    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Any other HTTP client failure, including undecodable bodies.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// A request rejected by the server.
#[derive(Debug)]
pub struct ServerError {
    /// HTTP status code.
    pub status: u16,
    /// Message from the response envelope, if any.
    pub message: Option<String>,
}

impl ServerError {
    /// Create a new server error.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Check if this is an expired/invalid authorization response.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerError {}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session is stored.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A refresh was needed but no refresh token is stored.
    #[error("no refresh token available")]
    RefreshTokenMissing,

    /// The refresh attempt failed; the session has been cleared.
    #[error("session refresh failed{}", message_suffix(.message))]
    RefreshRejected { message: Option<String> },

    /// Gave up waiting for an in-flight refresh.
    #[error("timed out waiting for session refresh")]
    RefreshTimedOut,
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Failures writing or clearing the token store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored session could not be encoded, or an existing one decoded.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A partial update was requested but no session is stored.
    #[error("no session stored")]
    Missing,
}
