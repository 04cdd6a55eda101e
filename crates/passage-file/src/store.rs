//! Filesystem storage for the session.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use passage_core::error::StorageError;
use passage_core::{AccessToken, RefreshToken, Result, SessionRecord, StoreKey, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// On-disk session document.
///
/// Every field is optional so that a file written by something else still
/// reads key by key; only a complete set counts as a session.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "ACCESS_TOKEN", default)]
    access_token: Option<String>,
    #[serde(rename = "REFRESH_TOKEN", default)]
    refresh_token: Option<String>,
    #[serde(rename = "USER_ROLE", default)]
    role: Option<String>,
    #[serde(rename = "USER_EMAIL", default)]
    email: Option<String>,
    /// RFC 3339 time of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
}

impl StoredSession {
    fn from_record(record: &SessionRecord) -> Self {
        Self {
            access_token: Some(record.access_token.as_str().to_string()),
            refresh_token: Some(record.refresh_token.as_str().to_string()),
            role: Some(record.role.clone()),
            email: Some(record.email.clone()),
            saved_at: Some(Utc::now().to_rfc3339()),
        }
    }

    fn get(&self, key: StoreKey) -> Option<&String> {
        match key {
            StoreKey::AccessToken => self.access_token.as_ref(),
            StoreKey::RefreshToken => self.refresh_token.as_ref(),
            StoreKey::Role => self.role.as_ref(),
            StoreKey::Email => self.email.as_ref(),
        }
    }

    fn is_complete(&self) -> bool {
        StoreKey::ALL.iter().all(|key| self.get(*key).is_some())
    }
}

/// A [`TokenStore`] persisted as a JSON file.
///
/// Writes replace the file atomically (temporary file, `fsync`, rename) while
/// holding an exclusive advisory lock on a sibling `.lock` file, so readers
/// always see a complete document. On Unix the file is created with mode
/// `0600`.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes writers within this process; the file lock covers other processes.
    write_guard: Mutex<()>,
}

impl FileTokenStore {
    /// Create a store at the given file path. Nothing is touched until the first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_guard: Mutex::new(()),
        }
    }

    /// Get the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the lock file path.
    fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.path)
    }

    /// When the session was last written, if recorded.
    pub async fn saved_at(&self) -> Option<String> {
        self.read_document().await.and_then(|doc| doc.saved_at)
    }

    async fn read_document(&self) -> Option<StoredSession> {
        let path = self.path.clone();
        match run_blocking(move || read_stored(&path)).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                None
            }
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    #[instrument(skip(self, record), fields(path = %self.path.display()))]
    async fn save(&self, record: &SessionRecord) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let doc = StoredSession::from_record(record);
        let (path, lock_path) = (self.path.clone(), self.lock_path());

        run_blocking(move || with_lock(&lock_path, || write_atomic(&path, &doc))).await?;

        debug!("Session saved");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn save_tokens(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let (path, lock_path) = (self.path.clone(), self.lock_path());
        let (access, refresh) = (access.as_str().to_string(), refresh.as_str().to_string());

        let updated = run_blocking(move || {
            with_lock(&lock_path, || {
                let Some(mut doc) = read_stored(&path)? else {
                    return Ok(false);
                };
                doc.access_token = Some(access);
                doc.refresh_token = Some(refresh);
                doc.saved_at = Some(Utc::now().to_rfc3339());
                write_atomic(&path, &doc)?;
                Ok(true)
            })
        })
        .await?;

        if !updated {
            return Err(StorageError::Missing.into());
        }

        debug!("Session tokens replaced");
        Ok(())
    }

    async fn read(&self, key: StoreKey) -> Option<String> {
        self.read_document().await?.get(key).cloned()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let (path, lock_path) = (self.path.clone(), self.lock_path());

        run_blocking(move || {
            with_lock(&lock_path, || match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            })
        })
        .await?;

        debug!("Session cleared");
        Ok(())
    }

    async fn load(&self) -> Option<SessionRecord> {
        let doc = self.read_document().await?;
        if !doc.is_complete() {
            return None;
        }
        SessionRecord::from_parts(doc.access_token, doc.refresh_token, doc.role, doc.email)
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "session".into());
    name.push(".lock");
    path.with_file_name(name)
}

type StoreResult<T> = std::result::Result<T, StorageError>;

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Io(io::Error::other(e)))?
}

/// Read the session document. A missing file is `Ok(None)`.
fn read_stored(path: &Path) -> StoreResult<Option<StoredSession>> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(serde_json::from_str(&json)?))
}

/// Run `f` while holding an exclusive lock on `lock_path`.
fn with_lock<T>(lock_path: &Path, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
    ensure_parent(lock_path)?;

    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;

    lock_file.lock_exclusive()?;
    let result = f();
    FileExt::unlock(&lock_file)?;

    result
}

fn write_atomic(path: &Path, doc: &StoredSession) -> StoreResult<()> {
    ensure_parent(path)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let json = serde_json::to_vec_pretty(doc)?;

    let written = (|| {
        let mut file = create_private(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    Ok(written?)
}

fn create_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path)
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passage_core::Error;
    use tempfile::TempDir;

    fn record() -> SessionRecord {
        SessionRecord::new(
            AccessToken::new("T1"),
            RefreshToken::new("R1"),
            "user",
            "a@b.com",
        )
    }

    fn store_in(dir: &TempDir) -> FileTokenStore {
        FileTokenStore::new(dir.path().join("nested").join("session.json"))
    }

    #[tokio::test]
    async fn save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&record()).await.unwrap();

        let reopened = FileTokenStore::new(store.path());
        assert_eq!(reopened.load().await, Some(record()));
        assert_eq!(
            reopened.read(StoreKey::Role).await.as_deref(),
            Some("user")
        );
        assert!(reopened.saved_at().await.is_some());
    }

    #[tokio::test]
    async fn file_uses_storage_key_names() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&record()).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(json["ACCESS_TOKEN"], "T1");
        assert_eq!(json["REFRESH_TOKEN"], "R1");
        assert_eq!(json["USER_ROLE"], "user");
        assert_eq!(json["USER_EMAIL"], "a@b.com");
    }

    #[tokio::test]
    async fn clear_removes_everything_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&record()).await.unwrap();
        store.clear().await.unwrap();

        for key in StoreKey::ALL {
            assert_eq!(store.read(key).await, None);
        }
        assert!(!store.path().exists());

        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn save_tokens_keeps_role_and_email() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&record()).await.unwrap();
        store
            .save_tokens(&AccessToken::new("T2"), &RefreshToken::new("R2"))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.access_token.as_str(), "T2");
        assert_eq!(loaded.refresh_token.as_str(), "R2");
        assert_eq!(loaded.role, "user");
        assert_eq!(loaded.email, "a@b.com");
    }

    #[tokio::test]
    async fn save_tokens_without_session_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let result = store
            .save_tokens(&AccessToken::new("T2"), &RefreshToken::new("R2"))
            .await;
        assert!(matches!(result, Err(Error::Storage(StorageError::Missing))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert_eq!(store.read(StoreKey::AccessToken).await, None);
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn save_tokens_over_corrupt_file_reports_decode_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        let result = store
            .save_tokens(&AccessToken::new("T2"), &RefreshToken::new("R2"))
            .await;

        assert!(matches!(result, Err(Error::Storage(StorageError::Serialize(_)))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn partial_file_is_not_a_session() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"ACCESS_TOKEN": "T1", "USER_ROLE": "user"}"#).unwrap();

        assert_eq!(store.read(StoreKey::AccessToken).await.as_deref(), Some("T1"));
        assert!(store.load().await.is_none());
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn no_temporary_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&record()).await.unwrap();
        store
            .save_tokens(&AccessToken::new("T2"), &RefreshToken::new("R2"))
            .await
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&record()).await.unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn lock_file_sits_next_to_session() {
        let lock = lock_path_for(Path::new("/tmp/passage/session.json"));
        assert_eq!(lock, PathBuf::from("/tmp/passage/session.json.lock"));
    }
}
