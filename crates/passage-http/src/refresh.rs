//! Single-flight token refresh.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use passage_core::error::{AuthError, TransportError};
use passage_core::{
    AccessToken, EntryPoint, RefreshToken, Result, SessionObserver, TokenPair, TokenStore,
};

/// The network half of a refresh: trade a refresh token for a new pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_tokens(&self, refresh_token: &RefreshToken) -> Result<TokenPair>;
}

/// What a queued caller is released with: the new access token, or the
/// display message of the failure.
type Outcome = std::result::Result<AccessToken, Option<String>>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

struct CoordinatorInner {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    observer: Arc<dyn SessionObserver>,
    refresh_timeout: Duration,
    wait_timeout: Duration,
    state: Mutex<RefreshState>,
}

/// Ensures at most one refresh call is in flight.
///
/// State machine `Idle -> Refreshing -> Idle`. The first caller to arrive
/// while idle starts the refresh; everyone arriving while it runs is queued
/// and released in arrival order with the same result. The refresh itself
/// runs on a spawned task, so it completes even if the caller that started
/// it goes away.
///
/// On failure the store is cleared and the observer is told to route to
/// [`EntryPoint::Register`] before any waiter is released.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        observer: Arc<dyn SessionObserver>,
        refresh_timeout: Duration,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                refresher,
                observer,
                refresh_timeout,
                wait_timeout,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Returns true while a refresh is in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.state.lock().await.refreshing
    }

    /// Obtain a fresh access token.
    ///
    /// `rejected` is the token the server just refused. If no refresh is
    /// running and the store already holds a different token, another caller
    /// renewed it in the meantime and that token is returned without a
    /// network call.
    #[instrument(skip_all)]
    pub async fn refresh(&self, rejected: Option<&AccessToken>) -> Result<AccessToken> {
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.inner.state.lock().await;

            if state.refreshing {
                state.waiters.push_back(tx);
                debug!(queued = state.waiters.len(), "Refresh in flight, waiting");
            } else {
                if let Some(current) = self.inner.store.access_token().await
                    && rejected != Some(&current)
                {
                    debug!("Access token already renewed");
                    return Ok(current);
                }

                state.refreshing = true;
                state.waiters.push_back(tx);
                self.spawn_refresh();
            }
        }

        match timeout(self.inner.wait_timeout, rx).await {
            Ok(Ok(Ok(token))) => Ok(token),
            Ok(Ok(Err(message))) => Err(AuthError::RefreshRejected { message }.into()),
            Ok(Err(_closed)) => Err(AuthError::RefreshRejected { message: None }.into()),
            Err(_elapsed) => {
                warn!(wait = ?self.inner.wait_timeout, "Gave up waiting for refresh");
                Err(AuthError::RefreshTimedOut.into())
            }
        }
    }

    fn spawn_refresh(&self) {
        let this = self.clone();
        tokio::spawn(async move { this.run_refresh().await });
    }

    async fn run_refresh(&self) {
        info!("Refreshing session");

        let outcome: Outcome = match self.exchange().await {
            Ok(token) => {
                debug!("Session refreshed successfully");
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, clearing session");
                if let Err(clear_err) = self.inner.store.clear().await {
                    error!(error = %clear_err, "Failed to clear session after refresh failure");
                }
                self.inner.observer.on_session_expired(EntryPoint::Register);
                Err(Some(e.display_message()))
            }
        };

        let waiters = {
            let mut state = self.inner.state.lock().await;
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        debug!(released = waiters.len(), "Releasing refresh waiters");
        for waiter in waiters {
            // A waiter that timed out has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Read the refresh token, call the network, persist the rotated pair.
    async fn exchange(&self) -> Result<AccessToken> {
        let refresh_token = self
            .inner
            .store
            .refresh_token()
            .await
            .ok_or(AuthError::RefreshTokenMissing)?;

        let call = self.inner.refresher.refresh_tokens(&refresh_token);
        let pair = timeout(self.inner.refresh_timeout, call)
            .await
            .map_err(|_| TransportError::Timeout {
                message: format!(
                    "refresh did not complete within {:?}",
                    self.inner.refresh_timeout
                ),
            })??;

        self.inner
            .store
            .save_tokens(&pair.access_token, &pair.refresh_token)
            .await?;

        Ok(pair.access_token)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_timeout", &self.inner.refresh_timeout)
            .field("wait_timeout", &self.inner.wait_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use passage_core::error::ServerError;
    use passage_core::{Error, MemoryStore, SessionRecord, StoreKey};
    use tokio::sync::Notify;

    /// Refresher that blocks until released and counts its calls.
    struct FakeRefresher {
        calls: AtomicUsize,
        gate: Notify,
        gated: bool,
        fail: bool,
    }

    impl FakeRefresher {
        fn new(gated: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                gated,
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for FakeRefresher {
        async fn refresh_tokens(&self, refresh_token: &RefreshToken) -> Result<TokenPair> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.gated {
                self.gate.notified().await;
            }
            if self.fail {
                return Err(ServerError::new(401, Some("Invalid refresh token".into())).into());
            }
            assert_eq!(refresh_token.as_str(), format!("R{}", n));
            Ok(TokenPair::new(
                AccessToken::new(format!("T{}", n + 1)),
                RefreshToken::new(format!("R{}", n + 1)),
            ))
        }
    }

    #[derive(Default)]
    struct RecordingObserver(StdMutex<Vec<EntryPoint>>);

    impl SessionObserver for RecordingObserver {
        fn on_session_expired(&self, entry: EntryPoint) {
            self.0.lock().unwrap().push(entry);
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_record(SessionRecord::new(
            AccessToken::new("T1"),
            RefreshToken::new("R1"),
            "user",
            "a@b.com",
        )))
    }

    fn coordinator(
        store: Arc<MemoryStore>,
        refresher: Arc<FakeRefresher>,
        observer: Arc<RecordingObserver>,
    ) -> RefreshCoordinator {
        RefreshCoordinator::new(
            store,
            refresher,
            observer,
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn single_caller_rotates_both_tokens() {
        let store = seeded_store();
        let refresher = FakeRefresher::new(false, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = coordinator(store.clone(), refresher.clone(), observer.clone());

        let token = coordinator
            .refresh(Some(&AccessToken::new("T1")))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "T2");
        assert_eq!(store.read(StoreKey::AccessToken).await.as_deref(), Some("T2"));
        assert_eq!(store.read(StoreKey::RefreshToken).await.as_deref(), Some("R2"));
        assert_eq!(store.read(StoreKey::Role).await.as_deref(), Some("user"));
        assert_eq!(refresher.calls(), 1);
        assert!(observer.0.lock().unwrap().is_empty());
        assert!(!coordinator.is_refreshing().await);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let store = seeded_store();
        let refresher = FakeRefresher::new(true, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = coordinator(store.clone(), refresher.clone(), observer);

        let stale = AccessToken::new("T1");
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let coordinator = coordinator.clone();
                let stale = stale.clone();
                tokio::spawn(async move { coordinator.refresh(Some(&stale)).await })
            })
            .collect();

        // Let every caller reach the queue before the refresh completes.
        while refresher.calls() == 0 || coordinator.inner.state.lock().await.waiters.len() < 5 {
            tokio::task::yield_now().await;
        }
        refresher.gate.notify_one();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.as_str(), "T2");
        }
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn waiters_are_released_in_arrival_order() {
        let store = seeded_store();
        let refresher = FakeRefresher::new(true, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = coordinator(store, refresher.clone(), observer);
        let released = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for id in 0..5 {
            let caller = coordinator.clone();
            let released = released.clone();
            handles.push(tokio::spawn(async move {
                let token = caller.refresh(Some(&AccessToken::new("T1"))).await;
                released.lock().unwrap().push(id);
                token
            }));

            // Queue each caller before the next one arrives.
            while coordinator.inner.state.lock().await.waiters.len() < id + 1 {
                tokio::task::yield_now().await;
            }
        }
        while refresher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        refresher.gate.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().as_str(), "T2");
        }
        assert_eq!(*released.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn already_renewed_token_skips_network() {
        let store = seeded_store();
        let refresher = FakeRefresher::new(false, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = coordinator(store, refresher.clone(), observer);

        let token = coordinator
            .refresh(Some(&AccessToken::new("T0-old")))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "T1");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn failure_clears_store_and_notifies_everyone() {
        let store = seeded_store();
        let refresher = FakeRefresher::new(true, true);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = coordinator(store.clone(), refresher.clone(), observer.clone());

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.refresh(Some(&AccessToken::new("T1"))).await })
            })
            .collect();

        while refresher.calls() == 0 || coordinator.inner.state.lock().await.waiters.len() < 3 {
            tokio::task::yield_now().await;
        }
        refresher.gate.notify_one();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(
                err,
                Error::Auth(AuthError::RefreshRejected { message: Some(ref m) }) if m == "Invalid refresh token"
            ));
        }

        assert_eq!(refresher.calls(), 1);
        assert!(store.load().await.is_none());
        assert_eq!(*observer.0.lock().unwrap(), vec![EntryPoint::Register]);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_network() {
        let store = Arc::new(MemoryStore::new());
        let refresher = FakeRefresher::new(false, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = coordinator(store, refresher.clone(), observer.clone());

        let err = coordinator.refresh(None).await.unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::RefreshRejected { .. })));
        assert_eq!(refresher.calls(), 0);
        assert_eq!(*observer.0.lock().unwrap(), vec![EntryPoint::Register]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_refresh_times_out_and_clears() {
        let store = seeded_store();
        // Gated and never released.
        let refresher = FakeRefresher::new(true, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            refresher.clone(),
            observer.clone(),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );

        let err = coordinator
            .refresh(Some(&AccessToken::new("T1")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::RefreshRejected { .. })));
        assert!(store.load().await.is_none());
        assert_eq!(*observer.0.lock().unwrap(), vec![EntryPoint::Register]);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_gives_up_after_wait_timeout() {
        let store = seeded_store();
        let refresher = FakeRefresher::new(true, false);
        let observer = Arc::new(RecordingObserver::default());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            refresher.clone(),
            observer.clone(),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        let err = coordinator
            .refresh(Some(&AccessToken::new("T1")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::RefreshTimedOut)));
        // The refresh itself is still running; the session is untouched.
        assert!(coordinator.is_refreshing().await);
        assert!(store.load().await.is_some());
        assert!(observer.0.lock().unwrap().is_empty());
    }
}
