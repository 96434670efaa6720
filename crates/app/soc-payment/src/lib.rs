mod checkout;
mod client;
mod error;
mod host;
mod poller;
mod return_url;

pub use checkout::CheckoutInitiator;
pub use client::{
    BillingApi, BillingClient, CHECKOUT_SESSION_PATH, CHECKOUT_STATUS_PATH, CheckoutRequest,
    CheckoutResponse,
};
pub use error::PollError;
pub use host::{Notice, PaymentHost};
pub use poller::{AbortReason, PaymentPoller, PollConfig, PollHandle, PollState};
pub use return_url::ReturnParams;
