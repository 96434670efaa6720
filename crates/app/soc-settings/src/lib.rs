use std::time::Duration;

use flow_core::Origin;
use serde::{Deserialize, Serialize};

mod error;
mod json;
mod persistence;

pub use error::{Error, Result};
pub use persistence::SETTINGS_FILE;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub api: ApiSettings,
    pub auth: AuthSettings,
    pub payment: PaymentSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    pub endpoint: String,
    /// Origin the application is served from.
    pub app_origin: Origin,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSettings {
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettings {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}
