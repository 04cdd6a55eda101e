//! Login and registration inputs.

use std::fmt;

use serde::Serialize;

use crate::error::InvalidInputError;

/// Minimum password length accepted by the registration endpoint.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Login credentials for the remote auth service.
///
/// # Security
///
/// The password is never exposed in Debug output to prevent accidental logging.
///
/// # Example
///
/// ```
/// use passage_core::Credentials;
///
/// let creds = Credentials::new("a@b.com", "secret1");
/// assert_eq!(creds.email(), "a@b.com");
/// assert!(creds.validate().is_ok());
/// ```
#[derive(Clone, Serialize)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Create new credentials. Surrounding whitespace is trimmed from the email.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// Returns the email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the password.
    ///
    /// # Security
    ///
    /// Use this only when constructing authentication requests.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check the fields before any network call is made.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        validate_email(&self.email)?;
        if self.password.trim().is_empty() {
            return Err(InvalidInputError::Password {
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

// Intentionally hide password in Debug output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account registration details.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Registration {
    /// Create a registration with the required fields.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
            phone_number: None,
            avatar_url: None,
        }
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    /// Check the fields before any network call is made.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.first_name.is_empty() {
            return Err(InvalidInputError::Name {
                field: "first name",
            });
        }
        if self.last_name.is_empty() {
            return Err(InvalidInputError::Name { field: "last name" });
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InvalidInputError::Password {
                reason: format!("must be at least {} characters", MIN_PASSWORD_LEN),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("phone_number", &self.phone_number)
            .field("avatar_url", &self.avatar_url)
            .finish()
    }
}

fn validate_email(email: &str) -> Result<(), InvalidInputError> {
    let invalid = |reason: &str| InvalidInputError::Email {
        value: email.to_string(),
        reason: reason.to_string(),
    };

    if email.is_empty() {
        return Err(invalid("must not be blank"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(invalid("must look like name@domain")),
    }
}
