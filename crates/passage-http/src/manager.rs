//! Session lifecycle: login, register, logout.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use passage_core::error::AuthError;
use passage_core::{
    AccessToken, Credentials, EntryPoint, NoopObserver, RefreshToken, Registration, Result,
    SessionObserver, SessionRecord, StoreKey, TokenStore,
};

use crate::authed::AuthedClient;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::endpoints::AuthPayload;
use crate::refresh::RefreshCoordinator;

/// Owns a token store and everything that changes it.
///
/// Cloning is cheap; clones share the store and the refresh coordinator, so
/// concurrent requests from any clone still refresh at most once.
#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    client: AuthedClient,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager that ignores forced-logout notifications.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        Self::with_observer(config, store, Arc::new(NoopObserver))
    }

    /// Create a manager that reports forced logouts to `observer`.
    pub fn with_observer(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let api = ApiClient::new(config);
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            Arc::new(api.clone()),
            observer,
            api.config().refresh_timeout,
            api.config().refresh_wait_timeout,
        );
        let client = AuthedClient::new(api.clone(), store.clone(), coordinator);

        Self { api, store, client }
    }

    /// Log in and persist the resulting session.
    ///
    /// On any failure the previously stored session is left as it was.
    #[instrument(skip_all, fields(email = credentials.email()))]
    pub async fn login(&self, credentials: Credentials) -> Result<SessionRecord> {
        credentials.validate()?;

        let payload = self.api.login(&credentials).await?;
        let record = self
            .persist(payload, credentials.email().to_string())
            .await?;

        info!(role = %record.role, "Logged in");
        Ok(record)
    }

    /// Create an account and persist the resulting session.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<SessionRecord> {
        registration.validate()?;

        let payload = self.api.register(&registration).await?;
        let record = self
            .persist(payload, registration.email.trim().to_string())
            .await?;

        info!(role = %record.role, "Registered");
        Ok(record)
    }

    /// End the session.
    ///
    /// The server is told first when an email is stored; its answer is only
    /// logged. The local session is cleared in every case.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<()> {
        match self.store.read(StoreKey::Email).await {
            Some(email) => {
                let token = self.store.access_token().await;
                if let Err(e) = self.api.logout(&email, token.as_ref()).await {
                    warn!(error = %e, "Remote logout failed, clearing local session anyway");
                }
            }
            None => info!("No stored email, skipping remote logout"),
        }

        self.store.clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Refresh the access token now, sharing any refresh already in flight.
    ///
    /// Without a stored session this fails with
    /// [`AuthError::NotAuthenticated`] and nothing is cleared.
    pub async fn refresh(&self) -> Result<AccessToken> {
        let Some(current) = self.store.load().await else {
            return Err(AuthError::NotAuthenticated.into());
        };
        self.client
            .coordinator()
            .refresh(Some(&current.access_token))
            .await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.is_authenticated().await
    }

    /// The complete stored session, if there is one.
    pub async fn current(&self) -> Option<SessionRecord> {
        self.store.load().await
    }

    pub async fn role(&self) -> Option<String> {
        self.store.read(StoreKey::Role).await
    }

    pub async fn email(&self) -> Option<String> {
        self.store.read(StoreKey::Email).await
    }

    /// Where a client should start: home when authenticated, register otherwise.
    pub async fn entry_point(&self) -> EntryPoint {
        EntryPoint::for_authenticated(self.is_authenticated().await)
    }

    /// Request wrapper for arbitrary authenticated calls.
    pub fn client(&self) -> &AuthedClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    async fn persist(&self, payload: AuthPayload, email: String) -> Result<SessionRecord> {
        let record = SessionRecord::new(
            AccessToken::new(payload.access_token),
            RefreshToken::new(payload.refresh_token),
            payload.role,
            email,
        );
        self.store.save(&record).await?;
        Ok(record)
    }
}
