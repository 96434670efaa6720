use std::sync::Arc;

use flow_core::{AuthMessage, AuthorizationOutcome, Origin};
use tracing::{info, warn};
use url::Url;

use crate::{GrantExchange, GrantRequest, TokenSource};

/// Something that can receive a cross-window message.
pub trait MessageTarget: Send + Sync {
    /// Delivers `message` only if the target window's origin is `target_origin`.
    fn post_message(&self, message: &AuthMessage, target_origin: &Origin);
}

/// The popup window the handshake runs in.
pub trait PopupWindow: Send + Sync {
    fn location(&self) -> Url;
    fn opener(&self) -> Option<Arc<dyn MessageTarget>>;
    fn close(&self);
}

/// What the redirect query says about the authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectQuery {
    Error(String),
    Grant(GrantRequest),
    Malformed,
}

impl RedirectQuery {
    /// Empty parameters count as absent. `error` wins over a grant.
    pub fn from_url(url: &Url) -> Self {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        match (error, code, state) {
            (Some(error), _, _) => RedirectQuery::Error(error),
            (None, Some(code), Some(state)) => RedirectQuery::Grant(GrantRequest { code, state }),
            _ => RedirectQuery::Malformed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeReport {
    /// A message was posted (if an opener existed) and the popup was closed.
    Delivered {
        message_type: &'static str,
        opener_present: bool,
    },
    /// The redirect carried neither an error nor a grant. Nothing was sent and
    /// the popup was left open; the opener's timeout covers this case.
    Stalled,
}

const NOT_SIGNED_IN: &str = "Not signed in. Please log in and try again.";

/// Completes an authorization redirect inside the popup and relays the
/// outcome to the opener. Runs once per popup.
pub struct HandshakeCoordinator<E, T> {
    exchange: E,
    tokens: T,
    app_origin: Origin,
}

impl<E, T> HandshakeCoordinator<E, T>
where
    E: GrantExchange,
    T: TokenSource,
{
    pub fn new(exchange: E, tokens: T, app_origin: Origin) -> Self {
        Self {
            exchange,
            tokens,
            app_origin,
        }
    }

    pub async fn run(&self, window: &dyn PopupWindow) -> HandshakeReport {
        let outcome = match RedirectQuery::from_url(&window.location()) {
            RedirectQuery::Error(error) => {
                info!(%error, "Provider returned an authorization error");
                AuthorizationOutcome::failure(error)
            }
            RedirectQuery::Grant(grant) => self.exchange_grant(&grant).await,
            RedirectQuery::Malformed => {
                warn!("Authorization redirect has neither an error nor a code/state pair");
                return HandshakeReport::Stalled;
            }
        };

        let message = AuthMessage::from(outcome);
        let opener = window.opener();
        match &opener {
            Some(opener) => opener.post_message(&message, &self.app_origin),
            None => warn!("Popup has no opener; outcome dropped"),
        }
        window.close();

        HandshakeReport::Delivered {
            message_type: message.type_tag(),
            opener_present: opener.is_some(),
        }
    }

    async fn exchange_grant(&self, grant: &GrantRequest) -> AuthorizationOutcome {
        let bearer = match self.tokens.bearer_token() {
            Ok(Some(token)) => token,
            Ok(None) => return AuthorizationOutcome::failure(NOT_SIGNED_IN),
            Err(e) => {
                warn!("Failed to read access token: {}", e);
                return AuthorizationOutcome::failure(NOT_SIGNED_IN);
            }
        };

        match self.exchange.exchange(grant, &bearer).await {
            Ok(grant_data) => {
                info!("Authorization grant exchanged");
                AuthorizationOutcome::Success { grant_data }
            }
            Err(e) => AuthorizationOutcome::failure(e.reason()),
        }
    }
}
