use flow_core::FlowError;
use thiserror::Error;

/// Opener-side failure to receive an outcome from the popup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("no authorization result within {0:?}")]
    TimedOut(std::time::Duration),

    #[error("authorization window is gone")]
    Abandoned,
}

impl From<HandshakeError> for FlowError {
    fn from(_: HandshakeError) -> Self {
        FlowError::UserAbandon
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token storage error: {0}")]
    Storage(#[from] keyring::Error),
}
