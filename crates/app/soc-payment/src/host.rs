use async_trait::async_trait;
use url::Url;

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Info(String),
    Error(String),
}

/// The page hosting the payment flows: its location, its notification area
/// and the locally cached subscription state.
#[async_trait]
pub trait PaymentHost: Send + Sync {
    fn current_url(&self) -> Url;

    /// Rewrites the address bar without navigating.
    fn replace_url(&self, url: Url);

    /// Full navigation away from the application.
    fn assign(&self, url: Url);

    fn notify(&self, notice: Notice);

    async fn refresh_subscription(&self) -> anyhow::Result<()>;
}
