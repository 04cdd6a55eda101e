//! Session lifecycle notifications.

use crate::session::EntryPoint;

/// Receives notice when the session ends without the user asking.
///
/// The refresh coordinator calls this after an unrecoverable refresh
/// failure, once the store has been cleared. A UI routes to `entry`.
pub trait SessionObserver: Send + Sync {
    fn on_session_expired(&self, entry: EntryPoint);
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_session_expired(&self, _entry: EntryPoint) {}
}

impl<F> SessionObserver for F
where
    F: Fn(EntryPoint) + Send + Sync,
{
    fn on_session_expired(&self, entry: EntryPoint) {
        self(entry)
    }
}
