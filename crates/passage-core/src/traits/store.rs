//! Token store trait.

use async_trait::async_trait;

use crate::session::{SessionRecord, StoreKey};
use crate::tokens::{AccessToken, RefreshToken};
use crate::Result;

/// Durable storage for the four session fields.
///
/// Writes are batched: a concurrent reader observes either the previous or
/// the new set of fields, never a mix. Reads are fail-soft: an
/// implementation that cannot read its backing storage reports the field as
/// absent, so the caller degrades to "unauthenticated".
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Replace all four fields.
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Replace the access and refresh tokens, leaving role and email as they are.
    async fn save_tokens(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()>;

    /// Read a single field.
    async fn read(&self, key: StoreKey) -> Option<String>;

    /// Remove all four fields. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<()>;

    /// Load the complete session, or `None` unless all four fields are present.
    async fn load(&self) -> Option<SessionRecord> {
        SessionRecord::from_parts(
            self.read(StoreKey::AccessToken).await,
            self.read(StoreKey::RefreshToken).await,
            self.read(StoreKey::Role).await,
            self.read(StoreKey::Email).await,
        )
    }

    /// Returns true when a complete session is stored.
    async fn is_authenticated(&self) -> bool {
        self.load().await.is_some()
    }

    /// The current access token, if any.
    async fn access_token(&self) -> Option<AccessToken> {
        self.read(StoreKey::AccessToken).await.map(AccessToken::new)
    }

    /// The current refresh token, if any.
    async fn refresh_token(&self) -> Option<RefreshToken> {
        self.read(StoreKey::RefreshToken).await.map(RefreshToken::new)
    }
}
