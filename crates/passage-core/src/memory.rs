//! In-memory token store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::session::{SessionRecord, StoreKey};
use crate::tokens::{AccessToken, RefreshToken};
use crate::traits::TokenStore;
use crate::Result;

/// A [`TokenStore`] that lives only as long as the process.
///
/// The whole record sits behind one lock, so every write is a batch write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: RwLock<Option<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session.
    pub fn with_record(record: SessionRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn save(&self, record: &SessionRecord) -> Result<()> {
        *self.record.write().await = Some(record.clone());
        debug!(email = %record.email, "Session saved in memory");
        Ok(())
    }

    async fn save_tokens(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()> {
        let mut guard = self.record.write().await;
        let record = guard.as_mut().ok_or(StorageError::Missing)?;
        record.access_token = access.clone();
        record.refresh_token = refresh.clone();
        Ok(())
    }

    async fn read(&self, key: StoreKey) -> Option<String> {
        self.record
            .read()
            .await
            .as_ref()
            .map(|record| record.get(key).to_string())
    }

    async fn clear(&self) -> Result<()> {
        *self.record.write().await = None;
        Ok(())
    }

    async fn load(&self) -> Option<SessionRecord> {
        self.record.read().await.clone()
    }
}
