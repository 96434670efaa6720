use std::env;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use flow_core::{AuthorizationOutcome, FlowError, Origin};
use serde_json::Value;
use soc_auth::{
    AuthClient, ChannelOpener, GrantExchange, HandshakeCoordinator, KeyringToken, OpenerListener,
    StaticToken, TokenSource,
};
use soc_endpoint::EndpointManager;
use soc_payment::{BillingClient, CheckoutInitiator, PaymentPoller, PollConfig};
use soc_settings::AppSettings;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use url::Url;

mod host;

use host::{TerminalHost, TerminalPopup};

const USAGE: &str = "usage:
  soc link <popup-redirect-url>     finish an account-linking redirect
  soc checkout <package-id> <page-url>
  soc confirm <return-url>          confirm a checkout after the redirect back";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(env::var("RUST_LOG").unwrap_or_else(|_| "soc_=debug".to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let settings = AppSettings::load_from_default_path_creating().context("failed to load settings")?;
    debug!(?settings, "Loaded settings");

    let endpoints = EndpointManager::new(&settings.api.endpoint)?;
    let tokens = token_source()?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["link", redirect] => {
            let location = Url::parse(redirect).context("invalid redirect URL")?;
            let coordinator = HandshakeCoordinator::new(
                AuthClient::new(endpoints.subscribe()),
                tokens,
                settings.api.app_origin.clone(),
            );
            let grant = link(&coordinator, location, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&grant)?);
        }
        ["checkout", package_id, page] => {
            let host = Arc::new(TerminalHost::new(
                Url::parse(page).context("invalid page URL")?,
            ));
            let billing = Arc::new(BillingClient::new(endpoints.subscribe(), tokens));
            CheckoutInitiator::new(billing, host)
                .start(package_id)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
        }
        ["confirm", return_url] => {
            let host = Arc::new(TerminalHost::new(
                Url::parse(return_url).context("invalid return URL")?,
            ));
            let billing = Arc::new(BillingClient::new(endpoints.subscribe(), tokens));
            let config = PollConfig {
                max_attempts: settings.payment.max_attempts,
                interval: settings.payment.poll_interval,
            };
            let poller = PaymentPoller::new(billing, host, config);

            let Some(handle) = poller.resume(|session| {
                info!(session_id = %session.session_id(), "Paid features unlocked");
            })?
            else {
                info!("No checkout session in the return URL");
                return Ok(());
            };

            let mut state_rx = handle.subscribe();
            loop {
                tokio::select! {
                    changed = state_rx.changed() => {
                        if changed.is_err() || state_rx.borrow().is_terminal() {
                            break;
                        }
                        let current = state_rx.borrow().clone();
                        debug!(state = ?current, "Payment poll progressed");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted; cancelling payment confirmation");
                        handle.cancel();
                    }
                }
            }
            let state = handle.join().await;
            info!(?state, "Payment confirmation finished");
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

/// Plays both windows of the account-linking handshake: the opener registers
/// first, then the popup completes the redirect and posts back to it.
async fn link<E, T>(
    coordinator: &HandshakeCoordinator<E, T>,
    location: Url,
    settings: &AppSettings,
) -> Result<Value>
where
    E: GrantExchange,
    T: TokenSource,
{
    let app_origin = settings.api.app_origin.clone();
    let popup_origin = Origin::of(&location)?;
    if popup_origin != app_origin {
        warn!(%popup_origin, %app_origin, "Redirect is not served from the app origin; the result will be ignored");
    }

    let (mut listener, sender) = OpenerListener::register(app_origin.clone());
    let opener = Arc::new(ChannelOpener::new(app_origin, popup_origin, sender));
    let popup = TerminalPopup::new(location, opener);

    let report = coordinator.run(&popup).await;
    debug!(?report, "Popup finished");

    // The popup stays open while the opener waits, as a stalled browser popup would.
    let outcome = listener.wait(settings.auth.handshake_timeout).await;
    drop(popup);

    outcome
        .map_err(FlowError::from)
        .and_then(AuthorizationOutcome::into_result)
        .map_err(|e| anyhow!(e.user_message()))
}

fn token_source() -> Result<Arc<dyn TokenSource>> {
    match env::var("SOC_ACCESS_TOKEN") {
        Ok(token) if !token.is_empty() => Ok(Arc::new(StaticToken::new(token))),
        _ => Ok(Arc::new(
            KeyringToken::new().context("failed to open the keyring")?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::json;
    use soc_auth::GrantRequest;
    use soc_endpoint::ApiError;
    use tokio::time::Instant;

    use super::*;

    struct GrantedExchange;

    #[async_trait]
    impl GrantExchange for GrantedExchange {
        async fn exchange(
            &self,
            grant: &GrantRequest,
            _bearer: &SecretString,
        ) -> std::result::Result<Value, ApiError> {
            Ok(json!({ "linked": true, "code": grant.code }))
        }
    }

    fn settings(handshake_timeout: Duration) -> AppSettings {
        let mut settings = AppSettings::defaults().unwrap();
        settings.api.app_origin = Origin::parse("https://app.example.com").unwrap();
        settings.auth.handshake_timeout = handshake_timeout;
        settings
    }

    fn coordinator(settings: &AppSettings) -> HandshakeCoordinator<GrantedExchange, StaticToken> {
        HandshakeCoordinator::new(
            GrantedExchange,
            StaticToken::new("tok"),
            settings.api.app_origin.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn link_returns_grant_from_popup() {
        let settings = settings(Duration::from_secs(300));
        let location = Url::parse("https://app.example.com/auth/facebook/callback?code=c1&state=s1").unwrap();

        let grant = link(&coordinator(&settings), location, &settings).await.unwrap();

        assert_eq!(grant, json!({ "linked": true, "code": "c1" }));
    }

    #[tokio::test(start_paused = true)]
    async fn link_gives_up_after_configured_handshake_timeout() {
        let settings = settings(Duration::from_secs(45));
        let location = Url::parse("https://app.example.com/auth/facebook/callback?state=s1").unwrap();
        let started = Instant::now();

        let err = link(&coordinator(&settings), location, &settings).await.unwrap_err();

        assert!(started.elapsed() >= Duration::from_secs(45));
        assert_eq!(err.to_string(), FlowError::UserAbandon.user_message());
    }

    #[tokio::test(start_paused = true)]
    async fn link_ignores_results_from_a_foreign_popup_origin() {
        let settings = settings(Duration::from_secs(10));
        let location = Url::parse("https://evil.example.net/callback?code=c1&state=s1").unwrap();

        let err = link(&coordinator(&settings), location, &settings).await.unwrap_err();

        assert_eq!(err.to_string(), FlowError::UserAbandon.user_message());
    }

    #[tokio::test(start_paused = true)]
    async fn link_surfaces_provider_error_verbatim() {
        let settings = settings(Duration::from_secs(300));
        let location = Url::parse("https://app.example.com/auth/facebook/callback?error=access_denied").unwrap();

        let err = link(&coordinator(&settings), location, &settings).await.unwrap_err();

        assert_eq!(err.to_string(), "access_denied");
    }
}
