use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FlowError;

pub const AUTH_SUCCESS_TYPE: &str = "FACEBOOK_AUTH_SUCCESS";
pub const AUTH_ERROR_TYPE: &str = "FACEBOOK_AUTH_ERROR";

/// Result of one popup authorization. Produced once and handed to the opener.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationOutcome {
    Success { grant_data: Value },
    Failure { reason: String },
}

impl AuthorizationOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Failures arrive as plain text from the popup and are shown verbatim.
    pub fn into_result(self) -> Result<Value, FlowError> {
        match self {
            Self::Success { grant_data } => Ok(grant_data),
            Self::Failure { reason } => Err(FlowError::External(reason)),
        }
    }
}

/// Wire form of an [`AuthorizationOutcome`] as posted between windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthMessage {
    #[serde(rename = "FACEBOOK_AUTH_SUCCESS")]
    Success { data: Value },
    #[serde(rename = "FACEBOOK_AUTH_ERROR")]
    Error { error: String },
}

impl AuthMessage {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Success { .. } => AUTH_SUCCESS_TYPE,
            Self::Error { .. } => AUTH_ERROR_TYPE,
        }
    }

    /// Parses an untrusted message payload. Payloads without a known `type`
    /// discriminant, or with the wrong fields for it, are rejected.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl From<AuthorizationOutcome> for AuthMessage {
    fn from(outcome: AuthorizationOutcome) -> Self {
        match outcome {
            AuthorizationOutcome::Success { grant_data } => Self::Success { data: grant_data },
            AuthorizationOutcome::Failure { reason } => Self::Error { error: reason },
        }
    }
}

impl From<AuthMessage> for AuthorizationOutcome {
    fn from(message: AuthMessage) -> Self {
        match message {
            AuthMessage::Success { data } => Self::Success { grant_data: data },
            AuthMessage::Error { error } => Self::Failure { reason: error },
        }
    }
}
