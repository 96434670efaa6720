use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use soc_endpoint::{ApiEndpoint, ApiError, read_json};
use tokio::sync::watch;
use tracing::error;

pub const GRANT_EXCHANGE_PATH: &str = "/api/facebook/callback";

/// Authorization grant taken from the popup redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantRequest {
    pub code: String,
    pub state: String,
}

/// Backend call that trades an authorization grant for durable access.
#[async_trait]
pub trait GrantExchange: Send + Sync {
    async fn exchange(&self, grant: &GrantRequest, bearer: &SecretString)
    -> Result<Value, ApiError>;
}

#[async_trait]
impl<T: GrantExchange + ?Sized> GrantExchange for Arc<T> {
    async fn exchange(
        &self,
        grant: &GrantRequest,
        bearer: &SecretString,
    ) -> Result<Value, ApiError> {
        (**self).exchange(grant, bearer).await
    }
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    endpoint_rx: watch::Receiver<ApiEndpoint>,
}

impl AuthClient {
    pub fn new(endpoint_rx: watch::Receiver<ApiEndpoint>) -> Self {
        Self { endpoint_rx }
    }
}

#[async_trait]
impl GrantExchange for AuthClient {
    async fn exchange(
        &self,
        grant: &GrantRequest,
        bearer: &SecretString,
    ) -> Result<Value, ApiError> {
        let endpoint = self.endpoint_rx.borrow().clone();
        let url = endpoint
            .url(GRANT_EXCHANGE_PATH)
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let response = endpoint
            .client()
            .post(url)
            .bearer_auth(bearer.expose_secret())
            .json(grant)
            .send()
            .await
            .map_err(|e| {
                error!("Grant exchange request failed: {}", e);
                ApiError::from(e)
            })?;

        read_json(response).await.inspect_err(|e| {
            error!("Grant exchange rejected: {}", e);
        })
    }
}
