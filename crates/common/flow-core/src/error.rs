/// User-facing failure taxonomy shared by both flows.
///
/// Every subsystem error is resolved into one of these and surfaced as a single
/// message; none of them is fatal to the application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// The popup or tab went away before the flow finished.
    #[error("flow abandoned before completion")]
    UserAbandon,

    /// The provider or backend rejected the request; the message is shown verbatim.
    #[error("{0}")]
    External(String),

    #[error("network error: {0}")]
    Transport(String),

    /// Poll budget exceeded. Settlement may still land server-side.
    #[error("retry budget exhausted")]
    TimeoutExhausted,

    /// Malformed input such as a redirect missing its parameters.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            FlowError::UserAbandon => "The authorization window was closed before it finished.".into(),
            FlowError::External(detail) => detail.clone(),
            FlowError::Transport(_) => "A network error occurred. Please try again.".into(),
            FlowError::TimeoutExhausted => {
                "Payment verification timed out. Please check your email for confirmation.".into()
            }
            FlowError::Validation(detail) => format!("Invalid request: {detail}"),
        }
    }

    /// Whether the user can sensibly try the same action again.
    pub fn is_retriable(&self) -> bool {
        matches!(self, FlowError::Transport(_) | FlowError::UserAbandon)
    }
}
