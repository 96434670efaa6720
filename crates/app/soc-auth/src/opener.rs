use std::time::Duration;

use flow_core::{AuthMessage, AuthorizationOutcome, Origin};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{HandshakeError, MessageTarget};

/// A raw window message as seen by the opener: the sender's origin plus an
/// untrusted payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub origin: String,
    pub data: Value,
}

/// Forwards window messages from the host into an [`OpenerListener`].
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<IncomingMessage>,
}

impl MessageSender {
    /// Returns `false` once the listener is gone.
    pub fn forward(&self, origin: impl Into<String>, data: Value) -> bool {
        self.tx
            .send(IncomingMessage {
                origin: origin.into(),
                data,
            })
            .is_ok()
    }
}

/// Opener-side end of the handshake.
///
/// Register it before opening the popup so no message can be missed. Every
/// message is treated as adversarial input: the sender origin must equal the
/// application origin and the payload must carry a known discriminant.
#[derive(Debug)]
pub struct OpenerListener {
    app_origin: Origin,
    rx: mpsc::UnboundedReceiver<IncomingMessage>,
}

impl OpenerListener {
    pub fn register(app_origin: Origin) -> (Self, MessageSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { app_origin, rx }, MessageSender { tx })
    }

    /// Waits for the first valid outcome. Invalid messages are logged and skipped.
    pub async fn wait(&mut self, timeout: Duration) -> Result<AuthorizationOutcome, HandshakeError> {
        let app_origin = &self.app_origin;
        let rx = &mut self.rx;

        let receive = async {
            while let Some(message) = rx.recv().await {
                if let Some(outcome) = accept(app_origin, message) {
                    return Ok(outcome);
                }
            }
            Err(HandshakeError::Abandoned)
        };

        match tokio::time::timeout(timeout, receive).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "Authorization popup did not report back");
                Err(HandshakeError::TimedOut(timeout))
            }
        }
    }
}

/// Validates one incoming message and extracts its outcome.
pub fn accept(app_origin: &Origin, message: IncomingMessage) -> Option<AuthorizationOutcome> {
    if !app_origin.matches(&message.origin) {
        warn!(origin = %message.origin, "Ignoring message from untrusted origin");
        return None;
    }

    match AuthMessage::from_value(message.data) {
        Ok(parsed) => {
            info!(message_type = parsed.type_tag(), "Received authorization result");
            Some(parsed.into())
        }
        Err(e) => {
            debug!("Ignoring message without a known discriminant: {}", e);
            None
        }
    }
}

/// In-process stand-in for an opener window.
///
/// Mirrors browser delivery rules: a message posted with a target origin other
/// than the opener's own is silently dropped, and the event is stamped with
/// the popup's origin.
#[derive(Debug, Clone)]
pub struct ChannelOpener {
    opener_origin: Origin,
    popup_origin: Origin,
    sender: MessageSender,
}

impl ChannelOpener {
    pub fn new(opener_origin: Origin, popup_origin: Origin, sender: MessageSender) -> Self {
        Self {
            opener_origin,
            popup_origin,
            sender,
        }
    }
}

impl MessageTarget for ChannelOpener {
    fn post_message(&self, message: &AuthMessage, target_origin: &Origin) {
        if *target_origin != self.opener_origin {
            debug!(%target_origin, "Target origin mismatch; message not delivered");
            return;
        }
        match serde_json::to_value(message) {
            Ok(data) => {
                if !self.sender.forward(self.popup_origin.serialization(), data) {
                    debug!("Opener stopped listening");
                }
            }
            Err(e) => warn!("Failed to serialize authorization message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn app() -> Origin {
        Origin::parse("https://app.example.com").unwrap()
    }

    #[test]
    fn accepts_success_from_own_origin() {
        let outcome = accept(
            &app(),
            IncomingMessage {
                origin: "https://app.example.com".into(),
                data: json!({ "type": "FACEBOOK_AUTH_SUCCESS", "data": { "pages": [] } }),
            },
        );
        assert_eq!(
            outcome,
            Some(AuthorizationOutcome::Success {
                grant_data: json!({ "pages": [] })
            })
        );
    }

    #[test]
    fn rejects_spoofed_origin_even_with_valid_payload() {
        let outcome = accept(
            &app(),
            IncomingMessage {
                origin: "https://evil.example.net".into(),
                data: json!({ "type": "FACEBOOK_AUTH_SUCCESS", "data": {} }),
            },
        );
        assert_eq!(outcome, None);
    }

    #[test]
    fn rejects_payload_without_discriminant() {
        let outcome = accept(
            &app(),
            IncomingMessage {
                origin: "https://app.example.com".into(),
                data: json!({ "source": "react-devtools", "payload": {} }),
            },
        );
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn wait_skips_invalid_messages() {
        let (mut listener, sender) = OpenerListener::register(app());
        sender.forward(
            "https://evil.example.net",
            json!({ "type": "FACEBOOK_AUTH_SUCCESS", "data": {} }),
        );
        sender.forward("https://app.example.com", json!({ "hello": "world" }));
        sender.forward(
            "https://app.example.com",
            json!({ "type": "FACEBOOK_AUTH_ERROR", "error": "access_denied" }),
        );

        let outcome = listener.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome, AuthorizationOutcome::failure("access_denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_when_popup_stalls() {
        let (mut listener, _sender) = OpenerListener::register(app());
        let result = listener.wait(Duration::from_secs(300)).await;
        assert_eq!(result, Err(HandshakeError::TimedOut(Duration::from_secs(300))));
    }

    #[tokio::test]
    async fn wait_reports_abandon_when_sender_dropped() {
        let (mut listener, sender) = OpenerListener::register(app());
        drop(sender);
        let result = listener.wait(Duration::from_secs(300)).await;
        assert_eq!(result, Err(HandshakeError::Abandoned));
    }

    #[test]
    fn channel_opener_drops_mismatched_target_origin() {
        let (mut listener, sender) = OpenerListener::register(app());
        let opener = ChannelOpener::new(app(), app(), sender);

        opener.post_message(
            &AuthMessage::Error { error: "x".into() },
            &Origin::parse("https://other.example.com").unwrap(),
        );

        assert!(listener.rx.try_recv().is_err());
    }
}
