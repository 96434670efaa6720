use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("invalid origin '{input}': {reason}")]
    Invalid { input: String, reason: String },

    #[error("'{0}' has an opaque origin")]
    Opaque(String),
}

/// A web origin (scheme, host, port).
///
/// Only tuple origins can be constructed, so a wildcard or `null` target can
/// never be used when posting or validating cross-window messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(url::Origin);

impl Origin {
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let url = Url::parse(input).map_err(|e| OriginError::Invalid {
            input: input.to_owned(),
            reason: e.to_string(),
        })?;
        Self::of(&url)
    }

    /// Origin of a full URL, ignoring path, query and fragment.
    pub fn of(url: &Url) -> Result<Self, OriginError> {
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(OriginError::Opaque(url.to_string()));
        }
        Ok(Self(origin))
    }

    /// Compares a raw sender origin, as reported by the message channel, with this one.
    /// Anything that does not parse to a tuple origin never matches.
    pub fn matches(&self, sender: &str) -> bool {
        Origin::parse(sender).is_ok_and(|other| other == *self)
    }

    pub fn serialization(&self) -> String {
        self.0.ascii_serialization()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialization())
    }
}

impl FromStr for Origin {
    type Err = OriginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Origin::parse(s)
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.serialization())
    }
}

impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Origin::parse(&raw).map_err(serde::de::Error::custom)
    }
}
