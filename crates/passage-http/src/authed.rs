//! Refresh-aware request wrapper.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use passage_core::{Result, TokenStore};

use crate::client::ApiClient;
use crate::endpoints::Envelope;
use crate::refresh::RefreshCoordinator;
use crate::request::{ApiRequest, Attempt};

/// Sends requests with the stored access token attached.
///
/// A 401 on the first attempt triggers a refresh through the shared
/// [`RefreshCoordinator`] and one resend with the new token. A 401 on the
/// resend, or any other failure, is returned to the caller.
#[derive(Clone)]
pub struct AuthedClient {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    coordinator: RefreshCoordinator,
}

impl std::fmt::Debug for AuthedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthedClient")
            .field("api", &self.api)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl AuthedClient {
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>, coordinator: RefreshCoordinator) -> Self {
        Self {
            api,
            store,
            coordinator,
        }
    }

    /// The underlying transport.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send a request and return the full response envelope.
    pub async fn send(&self, request: &ApiRequest) -> Result<Envelope<serde_json::Value>> {
        self.send_as(request).await
    }

    /// Send a request and return its `data` payload.
    ///
    /// Endpoints that answer with `"data": null` can be called as
    /// `request::<()>` or `request::<Option<T>>`.
    pub async fn request<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        self.send(request).await?.into_typed()
    }

    /// Send a request with the stored token but without refresh on 401.
    pub async fn send_once<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<Envelope<T>> {
        let token = self.store.access_token().await;
        self.api.execute(request, token.as_ref()).await
    }

    /// Send a request, refreshing and resending once on 401.
    #[instrument(skip(self, request), fields(method = %request.method(), path = request.path()))]
    pub async fn send_as<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<Envelope<T>> {
        let mut attempt = Attempt::First;
        let mut token = self.store.access_token().await;

        loop {
            let response = self.api.dispatch(request, token.as_ref()).await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                if let Some(next) = attempt.next() {
                    debug!("Access token rejected, refreshing");
                    let renewed = self.coordinator.refresh(token.as_ref()).await?;
                    token = Some(renewed);
                    attempt = next;
                    continue;
                }
                debug!("Access token rejected after refresh");
            }

            return self.api.decode(response).await;
        }
    }
}
