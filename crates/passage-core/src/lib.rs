//! passage-core - Core session types, stores and traits.
//!
//! The session is the four-field state (access token, refresh token, role,
//! email) that a client holds after logging in to the remote auth service.
//! Stores persist it, observers hear about forced logouts, and the
//! `passage-http` crate drives its lifecycle over the network.

pub mod credentials;
pub mod error;
pub mod memory;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::{Credentials, Registration};
pub use error::Error;
pub use memory::MemoryStore;
pub use session::{EntryPoint, SessionRecord, StoreKey};
pub use tokens::{AccessToken, RefreshToken, TokenPair};
pub use traits::{NoopObserver, SessionObserver, TokenStore};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
