use std::sync::Arc;

use async_trait::async_trait;
use flow_core::CheckoutStatusBody;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use soc_auth::TokenSource;
use soc_endpoint::{ApiEndpoint, ApiError, read_json};
use tokio::sync::watch;
use tracing::{error, warn};

pub const CHECKOUT_SESSION_PATH: &str = "/api/payments/checkout/session";
pub const CHECKOUT_STATUS_PATH: &str = "/api/payments/checkout/status";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub package_id: String,
    /// Origin the backend builds the success and cancel return URLs from.
    pub origin_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError>;

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatusBody, ApiError>;
}

#[async_trait]
impl<T: BillingApi + ?Sized> BillingApi for Arc<T> {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        (**self).create_checkout_session(request).await
    }

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatusBody, ApiError> {
        (**self).checkout_status(session_id).await
    }
}

#[derive(Clone)]
pub struct BillingClient {
    endpoint_rx: watch::Receiver<ApiEndpoint>,
    tokens: Arc<dyn TokenSource>,
}

impl BillingClient {
    pub fn new(endpoint_rx: watch::Receiver<ApiEndpoint>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            endpoint_rx,
            tokens,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer_token() {
            Ok(Some(token)) => request.bearer_auth(token.expose_secret()),
            Ok(None) => request,
            Err(e) => {
                warn!("Failed to read access token: {}", e);
                request
            }
        }
    }
}

#[async_trait]
impl BillingApi for BillingClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        let endpoint = self.endpoint_rx.borrow().clone();
        let url = endpoint
            .url(CHECKOUT_SESSION_PATH)
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let response = self
            .authorize(endpoint.client().post(url))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Checkout session request failed: {}", e);
                ApiError::from(e)
            })?;

        read_json(response).await
    }

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatusBody, ApiError> {
        let endpoint = self.endpoint_rx.borrow().clone();
        let mut url = endpoint
            .url(CHECKOUT_STATUS_PATH)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport("endpoint URL cannot take a path".into()))?
            .push(session_id);

        let response = self
            .authorize(endpoint.client().get(url))
            .send()
            .await
            .map_err(ApiError::from)?;

        read_json(response).await
    }
}
