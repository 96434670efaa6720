#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flow_core::CheckoutStatusBody;
use soc_endpoint::ApiError;
use soc_payment::{BillingApi, CheckoutRequest, CheckoutResponse, Notice, PaymentHost};
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

pub fn pending() -> Result<CheckoutStatusBody, ApiError> {
    Ok(CheckoutStatusBody {
        payment_status: Some("unpaid".into()),
        status: Some("open".into()),
    })
}

pub fn paid() -> Result<CheckoutStatusBody, ApiError> {
    Ok(CheckoutStatusBody {
        payment_status: Some("paid".into()),
        status: Some("complete".into()),
    })
}

pub fn expired() -> Result<CheckoutStatusBody, ApiError> {
    Ok(CheckoutStatusBody {
        payment_status: Some("unpaid".into()),
        status: Some("expired".into()),
    })
}

pub fn server_error() -> Result<CheckoutStatusBody, ApiError> {
    Err(ApiError::Status {
        status: 500,
        detail: Some("Internal Server Error".into()),
    })
}

/// Billing backend that replays a fixed list of status responses and keeps
/// answering `pending` once the list runs out.
pub struct ScriptedBilling {
    script: Mutex<VecDeque<Result<CheckoutStatusBody, ApiError>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    latency: Duration,
    gate: Option<Arc<Notify>>,
    pub checkout_requests: Mutex<Vec<CheckoutRequest>>,
    checkout_response: Result<CheckoutResponse, ApiError>,
}

impl ScriptedBilling {
    pub fn new(script: Vec<Result<CheckoutStatusBody, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            gate: None,
            checkout_requests: Mutex::new(Vec::new()),
            checkout_response: Ok(CheckoutResponse {
                url: "https://checkout.stripe.com/c/pay/cs_test_abc".into(),
                session_id: Some("cs_test_abc".into()),
            }),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every status call blocks until the gate is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_checkout_response(mut self, response: Result<CheckoutResponse, ApiError>) -> Self {
        self.checkout_response = response;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingApi for ScriptedBilling {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        self.checkout_requests.lock().unwrap().push(request.clone());
        self.checkout_response.clone()
    }

    async fn checkout_status(&self, _session_id: &str) -> Result<CheckoutStatusBody, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().unwrap_or_else(pending)
    }
}

pub struct FakeHost {
    url: Mutex<Url>,
    pub replaced: Mutex<Vec<Url>>,
    pub assigned: Mutex<Vec<Url>>,
    pub notices: Mutex<Vec<Notice>>,
    refreshes: AtomicUsize,
}

impl FakeHost {
    pub fn at(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: Mutex::new(Url::parse(url).unwrap()),
            replaced: Mutex::new(Vec::new()),
            assigned: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn url(&self) -> Url {
        self.url.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentHost for FakeHost {
    fn current_url(&self) -> Url {
        self.url()
    }

    fn replace_url(&self, url: Url) {
        *self.url.lock().unwrap() = url.clone();
        self.replaced.lock().unwrap().push(url);
    }

    fn assign(&self, url: Url) {
        self.assigned.lock().unwrap().push(url);
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    async fn refresh_subscription(&self) -> anyhow::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
