//! Core traits for token storage and session notifications.

mod observer;
mod store;

pub use observer::{NoopObserver, SessionObserver};
pub use store::TokenStore;
