mod error;
mod message;
mod origin;
mod payment;

pub use error::FlowError;
pub use message::{AUTH_ERROR_TYPE, AUTH_SUCCESS_TYPE, AuthMessage, AuthorizationOutcome};
pub use origin::{Origin, OriginError};
pub use payment::{CheckoutSession, CheckoutStatusBody, PaymentStatus, PollAttempt};
