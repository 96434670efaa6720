use std::sync::Arc;

use secrecy::SecretString;
use tracing::debug;

use crate::TokenError;

pub const ACCESS_TOKEN_HANDLE: &str = "AUTH_ACCESS_TOKEN";
const KEYRING_SERVICE: &str = "social-client";

/// Read-only access to the bearer token written by the main login flow.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Result<Option<SecretString>, TokenError>;
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn bearer_token(&self) -> Result<Option<SecretString>, TokenError> {
        (**self).bearer_token()
    }
}

/// Token held in memory, for hosts that already have it at hand.
#[derive(Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Result<Option<SecretString>, TokenError> {
        Ok(self.0.as_deref().map(|t| SecretString::from(t.to_owned())))
    }
}

/// Reads the access token from the platform keyring.
///
/// An absent or empty entry means the user is not signed in. Any other
/// keyring failure is reported as an error.
pub struct KeyringToken {
    entry: keyring::Entry,
}

impl KeyringToken {
    pub fn new() -> Result<Self, TokenError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, ACCESS_TOKEN_HANDLE)?;
        Ok(Self::from_entry(entry))
    }

    pub fn from_entry(entry: keyring::Entry) -> Self {
        Self { entry }
    }
}

impl TokenSource for KeyringToken {
    fn bearer_token(&self) -> Result<Option<SecretString>, TokenError> {
        match self.entry.get_password() {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(keyring::Error::NoEntry) => {
                debug!(handle = ACCESS_TOKEN_HANDLE, "no access token in keyring");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
