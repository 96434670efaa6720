use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("session {0} is already being checked")]
    AlreadyPolling(String),

    #[error("session {0} is already confirmed")]
    AlreadyConfirmed(String),
}
