//! passage-http - Session manager over the remote auth HTTP API.
//!
//! [`SessionManager`] logs in, registers and logs out against the
//! `/auth/v1` endpoints and owns the [`RefreshCoordinator`] that renews
//! expired access tokens. [`AuthedClient`] is the request wrapper: it
//! attaches the stored access token to every call and, on a 401, refreshes
//! once and resubmits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use passage_core::{ApiUrl, Credentials, MemoryStore};
//! use passage_http::{ApiRequest, ClientConfig, SessionManager};
//!
//! # async fn example() -> Result<(), passage_core::Error> {
//! let config = ClientConfig::new(ApiUrl::new("http://localhost:8080")?);
//! let manager = SessionManager::new(config, Arc::new(MemoryStore::new()));
//!
//! let session = manager.login(Credentials::new("a@b.com", "secret1")).await?;
//! println!("logged in as {} ({})", session.email, session.role);
//!
//! let profile: serde_json::Value = manager
//!     .client()
//!     .request(&ApiRequest::get("/users/me"))
//!     .await?;
//! println!("{profile}");
//! # Ok(())
//! # }
//! ```

mod authed;
mod client;
mod config;
mod endpoints;
mod manager;
mod refresh;
mod request;

pub use authed::AuthedClient;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use endpoints::{AuthPayload, Envelope, RefreshPayload};
pub use manager::SessionManager;
pub use refresh::{RefreshCoordinator, TokenRefresher};
pub use request::{ApiRequest, Attempt};
pub use reqwest::Method;
