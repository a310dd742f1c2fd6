//! Credentials held by a client for its whole lifetime
//!
//! A password plus exactly one identity: the Share username, or the account
//! id (UUID) when the caller already knows it. Validation happens at
//! construction so a misconfigured client never touches the network.

use std::fmt;

use uuid::Uuid;
use zeroize::Zeroize;

use crate::error::{ArgumentError, Result};

/// Share password. Redacted in Debug/Display and wiped on drop.
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the plaintext for a request body.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Which identifier the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Username(String),
    AccountId(String),
}

/// Validated credentials.
#[derive(Debug)]
pub struct Credentials {
    identity: Identity,
    password: Password,
}

impl Credentials {
    /// Build credentials from optional identity fields.
    ///
    /// Exactly one of `username` / `account_id` must be given. A username
    /// must be non-empty; an account id must be a non-sentinel UUID.
    pub fn new(
        password: impl Into<String>,
        username: Option<String>,
        account_id: Option<String>,
    ) -> Result<Self> {
        let identity = match (username, account_id) {
            (Some(_), Some(_)) => return Err(ArgumentError::TooManyUserIds.into()),
            (None, None) => return Err(ArgumentError::NoUserId.into()),
            (Some(username), None) => Identity::Username(username),
            (None, Some(account_id)) => Identity::AccountId(account_id),
        };

        let password = Password::new(password);
        if password.is_empty() {
            return Err(ArgumentError::PasswordInvalid.into());
        }

        match &identity {
            Identity::Username(username) if username.is_empty() => {
                return Err(ArgumentError::UsernameInvalid.into());
            }
            Identity::AccountId(account_id) => validate_account_id(account_id)?,
            Identity::Username(_) => {}
        }

        Ok(Self { identity, password })
    }

    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Self::new(password, Some(username.into()), None)
    }

    pub fn with_account_id(
        account_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(password, None, Some(account_id.into()))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn username(&self) -> Option<&str> {
        match &self.identity {
            Identity::Username(username) => Some(username),
            Identity::AccountId(_) => None,
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        match &self.identity {
            Identity::AccountId(account_id) => Some(account_id),
            Identity::Username(_) => None,
        }
    }

    pub fn password(&self) -> &Password {
        &self.password
    }
}

/// Parse `value` as a UUID, distinguishing malformed from the nil sentinel.
enum UuidCheck {
    Valid,
    Malformed,
    Sentinel,
}

fn check_uuid(value: &str) -> UuidCheck {
    match Uuid::try_parse(value) {
        Ok(uuid) if uuid.is_nil() => UuidCheck::Sentinel,
        Ok(_) => UuidCheck::Valid,
        Err(_) => UuidCheck::Malformed,
    }
}

/// Account ids must be UUIDs and never the all-zero default.
pub fn validate_account_id(value: &str) -> Result<()> {
    match check_uuid(value) {
        UuidCheck::Valid => Ok(()),
        UuidCheck::Malformed => Err(ArgumentError::AccountIdInvalid.into()),
        UuidCheck::Sentinel => Err(ArgumentError::AccountIdDefault.into()),
    }
}

/// Session ids must be UUIDs and never the all-zero default.
pub fn validate_session_id(value: &str) -> Result<()> {
    match check_uuid(value) {
        UuidCheck::Valid => Ok(()),
        UuidCheck::Malformed => Err(ArgumentError::SessionIdInvalid.into()),
        UuidCheck::Sentinel => Err(ArgumentError::SessionIdDefault.into()),
    }
}
