use std::sync::Arc;

use flow_core::{FlowError, Origin};
use soc_endpoint::ApiError;
use tracing::{error, info, warn};
use url::Url;

use crate::{BillingApi, CheckoutRequest, Notice, PaymentHost};

const GENERIC_CHECKOUT_ERROR: &str = "Failed to start checkout";

/// Starts a checkout for a package and sends the browser to the hosted
/// payment page. Completion comes back through a full redirect, picked up by
/// [`crate::PaymentPoller::resume`].
pub struct CheckoutInitiator<B> {
    billing: Arc<B>,
    host: Arc<dyn PaymentHost>,
}

impl<B: BillingApi> CheckoutInitiator<B> {
    pub fn new(billing: Arc<B>, host: Arc<dyn PaymentHost>) -> Self {
        Self { billing, host }
    }

    /// Returns the checkout URL the browser was sent to.
    pub async fn start(&self, package_id: &str) -> Result<Url, FlowError> {
        let result = self.request_checkout(package_id).await;
        match &result {
            Ok(url) => {
                info!(%package_id, "Redirecting to checkout");
                self.host.assign(url.clone());
            }
            Err(e) => self.host.notify(Notice::Error(e.user_message())),
        }
        result
    }

    async fn request_checkout(&self, package_id: &str) -> Result<Url, FlowError> {
        let package_id = package_id.trim();
        if package_id.is_empty() {
            return Err(FlowError::Validation("package id is empty".into()));
        }

        let origin = Origin::of(&self.host.current_url())
            .map_err(|e| FlowError::Validation(e.to_string()))?;
        let request = CheckoutRequest {
            package_id: package_id.to_owned(),
            origin_url: origin.serialization(),
        };

        let response = self
            .billing
            .create_checkout_session(&request)
            .await
            .map_err(|e| {
                error!(%package_id, "Checkout session creation failed: {}", e);
                checkout_error(e)
            })?;

        Url::parse(&response.url).map_err(|e| {
            warn!(url = %response.url, "Backend returned an invalid checkout URL: {}", e);
            FlowError::External(GENERIC_CHECKOUT_ERROR.into())
        })
    }
}

fn checkout_error(err: ApiError) -> FlowError {
    match err {
        ApiError::Status {
            detail: Some(detail),
            ..
        } => FlowError::External(detail),
        ApiError::Transport(reason) => FlowError::Transport(reason),
        ApiError::Status { detail: None, .. } | ApiError::Decode(_) => {
            FlowError::External(GENERIC_CHECKOUT_ERROR.into())
        }
    }
}
