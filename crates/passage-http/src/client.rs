//! HTTP transport for the auth API.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use passage_core::error::{Error, InvalidInputError, ServerError, TransportError};
use passage_core::{AccessToken, Credentials, RefreshToken, Registration, Result, TokenPair};

use crate::config::ClientConfig;
use crate::endpoints::{
    AuthPayload, Envelope, ErrorBody, LOGIN, LOGOUT, LOGOUT_PARAM, REFRESH, REFRESH_TOKEN_PARAM,
    REGISTER, RefreshPayload,
};
use crate::refresh::TokenRefresher;
use crate::request::ApiRequest;

/// Map a `reqwest` failure onto the transport error variants.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let message = err.to_string();
    let err = if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connection { message }
    } else {
        TransportError::Http { message }
    };
    Error::Transport(err)
}

/// Unauthenticated-by-default HTTP client for the auth API.
///
/// This layer knows nothing about the token store: callers pass the token
/// to attach. [`crate::AuthedClient`] builds the refresh-aware wrapper on top.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new client for the configured service.
    pub fn new(config: ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { client, config }
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one attempt of a request, attaching `token` as a bearer credential when present.
    ///
    /// The raw response is returned so the caller can inspect the status
    /// before decoding.
    #[instrument(skip(self, request, token), fields(method = %request.method(), path = request.path()))]
    pub async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response> {
        let url = self.config.base_url.endpoint(request.path());
        debug!(%url, authed = token.is_some(), "API request");

        let mut builder = self.client.request(request.method().clone(), &url);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.json_body() {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout_override() {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, bearer_header(token)?);
        }

        builder.send().await.map_err(transport_error)
    }

    /// Decode a response envelope, turning failures into [`ServerError`]s.
    pub async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Envelope<T>> {
        let status = response.status();
        trace!(status = %status, "API response");

        if !status.is_success() {
            return Err(Error::Server(self.parse_error_response(response).await));
        }

        let envelope: Envelope<T> = response.json().await.map_err(transport_error)?;
        if !envelope.success {
            return Err(ServerError::new(status.as_u16(), envelope.message).into());
        }

        Ok(envelope)
    }

    /// Dispatch and decode in one step, with no refresh handling.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<Envelope<T>> {
        let response = self.dispatch(request, token).await?;
        self.decode(response).await
    }

    /// Exchange credentials for a session.
    #[instrument(skip(self, credentials), fields(email = credentials.email()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload> {
        let request = ApiRequest::post(LOGIN).body(credentials)?;
        self.execute::<AuthPayload>(&request, None)
            .await?
            .into_data()
    }

    /// Create an account and receive a session for it.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthPayload> {
        let request = ApiRequest::post(REGISTER).body(registration)?;
        self.execute::<AuthPayload>(&request, None)
            .await?
            .into_data()
    }

    /// Exchange a refresh token for a new access/refresh pair.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenPair> {
        let request = ApiRequest::post(REFRESH)
            .query(REFRESH_TOKEN_PARAM, refresh_token.as_str())
            .timeout(self.config.refresh_timeout);

        let payload: RefreshPayload = self.execute(&request, None).await?.into_data()?;
        Ok(payload.into())
    }

    /// Revoke the server-side session identified by a refresh token or email.
    #[instrument(skip(self, token_or_email, token))]
    pub async fn logout(&self, token_or_email: &str, token: Option<&AccessToken>) -> Result<()> {
        let request = ApiRequest::post(LOGOUT).query(LOGOUT_PARAM, token_or_email);
        self.execute::<serde_json::Value>(&request, token).await?;
        Ok(())
    }

    /// Parse an error response body, keeping whatever message it offers.
    async fn parse_error_response(&self, response: reqwest::Response) -> ServerError {
        let status = response.status().as_u16();

        match response.json::<ErrorBody>().await {
            Ok(body) => ServerError::new(status, body.into_message()),
            Err(_) => ServerError::new(status, None),
        }
    }
}

#[async_trait]
impl TokenRefresher for ApiClient {
    async fn refresh_tokens(&self, refresh_token: &RefreshToken) -> Result<TokenPair> {
        self.refresh(refresh_token).await
    }
}

fn bearer_header(token: &AccessToken) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&token.bearer()).map_err(|_| InvalidInputError::Other {
        message: "access token contains characters not allowed in a header".to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use passage_core::ApiUrl;

    #[test]
    fn client_creation() {
        let config = ClientConfig::new(ApiUrl::new("http://localhost:8080").unwrap());
        let client = ApiClient::new(config);
        assert_eq!(client.config().base_url.host(), Some("localhost"));
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let value = bearer_header(&AccessToken::new("T1")).unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer T1");
        assert!(value.is_sensitive());
    }

    #[test]
    fn bearer_header_rejects_newlines() {
        assert!(bearer_header(&AccessToken::new("T1\r\nX-Evil: 1")).is_err());
    }
}
