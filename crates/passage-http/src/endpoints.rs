//! Auth API endpoint definitions and request/response types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use passage_core::error::TransportError;
use passage_core::{AccessToken, RefreshToken, Result, TokenPair};

// ============================================================================
// Endpoint Paths
// ============================================================================

/// POST, body `{email, password}`
pub const LOGIN: &str = "/auth/v1/login";

/// POST, body is a [`passage_core::Registration`]
pub const REGISTER: &str = "/auth/v1/register";

/// POST, query `token=<refresh token>`
pub const REFRESH: &str = "/auth/v1/refresh";

/// POST, query `tokenOrEmail=<value>`
pub const LOGOUT: &str = "/auth/v1/logout";

/// Query parameter carrying the refresh token.
pub const REFRESH_TOKEN_PARAM: &str = "token";

/// Query parameter identifying the session to revoke.
pub const LOGOUT_PARAM: &str = "tokenOrEmail";

// ============================================================================
// Response Types
// ============================================================================

/// Wrapper around every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Take the payload, failing if the server sent none.
    pub fn into_data(self) -> Result<T> {
        self.data.ok_or_else(|| {
            TransportError::Http {
                message: "response envelope carried no data".to_string(),
            }
            .into()
        })
    }
}

impl Envelope<serde_json::Value> {
    /// Decode the payload as `T`. A missing or `null` payload decodes as
    /// JSON `null`, so `()` and `Option<_>` accept it.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let data = self.data.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| {
            TransportError::Http {
                message: format!("response data could not be decoded: {}", e),
            }
            .into()
        })
    }
}

/// Payload of login and register.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub role: String,
}

/// Payload of refresh. The server may also echo the role; it is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<RefreshPayload> for TokenPair {
    fn from(payload: RefreshPayload) -> Self {
        TokenPair::new(
            AccessToken::new(payload.access_token),
            RefreshToken::new(payload.refresh_token),
        )
    }
}

/// Lenient view of an error body. Frameworks that bypass the envelope
/// usually still send `error`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.error.filter(|e| !e.is_empty()))
    }
}
