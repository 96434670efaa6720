mod error;
mod response;

pub use error::{EndpointError, Result};
pub use response::{ApiError, read_json};

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8001";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend base URL paired with the HTTP client used to reach it.
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    base: Url,
    client: reqwest::Client,
}

impl ApiEndpoint {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = parse_base(base_url)?;
        let client = reqwest::ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(EndpointError::Client)?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Resolves an absolute API path (`/api/...`) against the base URL,
    /// keeping any path prefix the base carries.
    pub fn url(&self, path: &str) -> Result<Url> {
        let base = self.base.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|e| EndpointError::InvalidUrl(e.to_string()))
    }
}

/// Centralized API endpoint manager.
///
/// Owns the current API URL and broadcasts a fresh [`ApiEndpoint`] via
/// `tokio::sync::watch` whenever it changes. Consumers subscribe once and
/// always read the latest endpoint.
pub struct EndpointManager {
    tx: watch::Sender<ApiEndpoint>,
}

impl EndpointManager {
    pub fn new(initial_url: &str) -> Result<Self> {
        let url = if initial_url.is_empty() {
            DEFAULT_API_URL
        } else {
            initial_url
        };

        let (tx, _) = watch::channel(ApiEndpoint::new(url)?);
        Ok(Self { tx })
    }

    pub fn subscribe(&self) -> watch::Receiver<ApiEndpoint> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ApiEndpoint {
        self.tx.borrow().clone()
    }

    pub fn set_global_backend_url(&self, url: &str) -> Result<()> {
        let endpoint = ApiEndpoint::new(url)?;
        self.tx.send_replace(endpoint);
        info!("Switched API endpoint to {}", url);
        Ok(())
    }
}

fn parse_base(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| EndpointError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(EndpointError::InvalidUrl(format!(
            "{url}: scheme must be http or https"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_falls_back_to_default() {
        let manager = EndpointManager::new("").unwrap();
        assert_eq!(manager.current().base().as_str(), "http://localhost:8001/");
    }

    #[test]
    fn url_keeps_base_prefix() {
        let endpoint = ApiEndpoint::new("https://api.example.com/v1/").unwrap();
        assert_eq!(
            endpoint.url("/api/payments/checkout/session").unwrap().as_str(),
            "https://api.example.com/v1/api/payments/checkout/session"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(matches!(
            ApiEndpoint::new("ftp://example.com"),
            Err(EndpointError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiEndpoint::new("not a url"),
            Err(EndpointError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn subscribers_see_switched_endpoint() {
        let manager = EndpointManager::new("http://localhost:8001").unwrap();
        let mut rx = manager.subscribe();

        manager
            .set_global_backend_url("https://staging.example.com")
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().base().host_str(), Some("staging.example.com"));
    }
}
