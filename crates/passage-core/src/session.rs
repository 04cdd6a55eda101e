//! The persisted session state.

use std::fmt;

use crate::tokens::{AccessToken, RefreshToken};

/// One of the four persisted session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    Role,
    Email,
}

impl StoreKey {
    /// All keys, in the order they are written.
    pub const ALL: [StoreKey; 4] = [
        StoreKey::AccessToken,
        StoreKey::RefreshToken,
        StoreKey::Role,
        StoreKey::Email,
    ];

    /// The key name used in durable storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "ACCESS_TOKEN",
            StoreKey::RefreshToken => "REFRESH_TOKEN",
            StoreKey::Role => "USER_ROLE",
            StoreKey::Email => "USER_EMAIL",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete authenticated session.
///
/// All four fields are always present; a store holding only some of them is
/// treated as holding no session at all.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub role: String,
    pub email: String,
}

impl SessionRecord {
    pub fn new(
        access_token: AccessToken,
        refresh_token: RefreshToken,
        role: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            role: role.into(),
            email: email.into(),
        }
    }

    /// Assemble a record from raw stored values, or `None` if any is missing.
    pub fn from_parts(
        access_token: Option<String>,
        refresh_token: Option<String>,
        role: Option<String>,
        email: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            access_token: AccessToken::new(access_token?),
            refresh_token: RefreshToken::new(refresh_token?),
            role: role?,
            email: email?,
        })
    }

    /// Returns the stored value for a single key.
    pub fn get(&self, key: StoreKey) -> &str {
        match key {
            StoreKey::AccessToken => self.access_token.as_str(),
            StoreKey::RefreshToken => self.refresh_token.as_str(),
            StoreKey::Role => &self.role,
            StoreKey::Email => &self.email,
        }
    }
}

// Tokens are redacted by their own Debug impls.
impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .field("role", &self.role)
            .field("email", &self.email)
            .finish()
    }
}

/// The screen a client should show based on the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Authenticated home screen.
    Home,
    /// Unauthenticated entry point; also the destination of a forced logout.
    Register,
}

impl EntryPoint {
    pub fn for_authenticated(authenticated: bool) -> Self {
        if authenticated {
            EntryPoint::Home
        } else {
            EntryPoint::Register
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Home => f.write_str("home"),
            EntryPoint::Register => f.write_str("register"),
        }
    }
}
