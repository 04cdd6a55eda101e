//! Request descriptions.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use passage_core::error::InvalidInputError;
use passage_core::Result;

/// One logical API request, independent of any attempt to send it.
///
/// The same value is resubmitted unchanged after a token refresh; whether a
/// send is the first try or the retry is tracked separately by [`Attempt`].
#[derive(Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a JSON body from any serializable value.
    pub fn body<B: Serialize>(self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| InvalidInputError::Other {
            message: format!("request body could not be encoded: {}", e),
        })?;
        Ok(self.json(value))
    }

    /// Override the client-wide timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn json_body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }
}

// Bodies and query values may carry credentials; only their shape is shown.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.query.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query_keys", &keys)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Which send of a logical request this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Sent with the token read from the store.
    First,
    /// Resent once with a refreshed token. A 401 here is final.
    Retry,
}

impl Attempt {
    pub fn is_retry(self) -> bool {
        matches!(self, Attempt::Retry)
    }

    /// The attempt that follows this one, if another is allowed.
    pub fn next(self) -> Option<Attempt> {
        match self {
            Attempt::First => Some(Attempt::Retry),
            Attempt::Retry => None,
        }
    }
}
