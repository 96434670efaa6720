use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use soc_auth::{MessageTarget, PopupWindow};
use soc_payment::{Notice, PaymentHost};
use tracing::info;
use url::Url;

/// Stands in for the browser page when the flows are driven from a terminal.
pub struct TerminalHost {
    url: Mutex<Url>,
}

impl TerminalHost {
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }
}

#[async_trait]
impl PaymentHost for TerminalHost {
    fn current_url(&self) -> Url {
        match self.url.lock() {
            Ok(url) => url.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_url(&self, url: Url) {
        info!(%url, "Page URL updated");
        match self.url.lock() {
            Ok(mut current) => *current = url,
            Err(poisoned) => *poisoned.into_inner() = url,
        }
    }

    fn assign(&self, url: Url) {
        println!("Continue to checkout: {url}");
    }

    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(message) => println!("✔ {message}"),
            Notice::Info(message) => println!("ℹ {message}"),
            Notice::Error(message) => eprintln!("✖ {message}"),
        }
    }

    async fn refresh_subscription(&self) -> anyhow::Result<()> {
        info!("Subscription state refreshed");
        Ok(())
    }
}

/// The popup half of a terminal-driven handshake. Its opener is the
/// in-process listener that plays the application window.
pub struct TerminalPopup {
    location: Url,
    opener: Arc<dyn MessageTarget>,
}

impl TerminalPopup {
    pub fn new(location: Url, opener: Arc<dyn MessageTarget>) -> Self {
        Self { location, opener }
    }
}

impl PopupWindow for TerminalPopup {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn opener(&self) -> Option<Arc<dyn MessageTarget>> {
        Some(self.opener.clone())
    }

    fn close(&self) {
        info!("Popup closed");
    }
}
