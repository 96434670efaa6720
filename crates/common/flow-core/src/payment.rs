use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Origin;

/// Settlement status of a checkout session, recomputed from every status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    /// Terminal for the current attempt only; the user may start over.
    Error,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Expired => write!(f, "expired"),
            PaymentStatus::Error => write!(f, "error"),
        }
    }
}

/// Body returned by the checkout-status endpoint. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutStatusBody {
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CheckoutStatusBody {
    pub fn payment_status(&self) -> PaymentStatus {
        if self.payment_status.as_deref() == Some("paid") {
            PaymentStatus::Paid
        } else if self.status.as_deref() == Some("expired") {
            PaymentStatus::Expired
        } else {
            PaymentStatus::Pending
        }
    }
}

/// One attempt to pay for a package through an externally hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    session_id: String,
    return_origin: Origin,
}

impl CheckoutSession {
    pub fn new(session_id: impl Into<String>, return_origin: Origin) -> Self {
        Self {
            session_id: session_id.into(),
            return_origin,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn return_origin(&self) -> &Origin {
        &self.return_origin
    }
}

/// A single scheduled status query. Lives for one iteration of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt<'a> {
    pub session_id: &'a str,
    pub attempt_number: u32,
    pub scheduled_at: DateTime<Utc>,
}

impl<'a> PollAttempt<'a> {
    pub fn new(session_id: &'a str, attempt_number: u32) -> Self {
        Self {
            session_id,
            attempt_number,
            scheduled_at: Utc::now(),
        }
    }
}
