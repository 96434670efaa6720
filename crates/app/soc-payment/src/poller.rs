use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flow_core::{CheckoutSession, FlowError, PaymentStatus, PollAttempt};
use soc_endpoint::ApiError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use crate::return_url::{
    PAYMENT_CANCELLED_PARAM, PAYMENT_SUCCESS_PARAM, SESSION_ID_PARAM, strip_params,
};
use crate::{BillingApi, Notice, PaymentHost, PollError, ReturnParams};

const CONFIRMED_MESSAGE: &str = "Payment successful! Your subscription is now active.";
const EXPIRED_MESSAGE: &str = "Payment session expired. Please try again.";
const STATUS_ERROR_MESSAGE: &str = "Error checking payment status. Please try again.";
const CANCELLED_MESSAGE: &str = "Payment was cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    /// Fixed delay between attempts. Settlement is expected within seconds,
    /// so there is no backoff.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling { session_id: String, attempt: u32 },
    Confirmed,
    Expired,
    Aborted(AbortReason),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Confirmed | PollState::Expired | PollState::Aborted(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Every attempt came back pending. The payment may still settle.
    TimedOut,
    Transport(String),
    Cancelled,
}

#[derive(Debug, Clone)]
enum SessionSlot {
    Active,
    Confirmed,
}

/// Confirms externally hosted checkout sessions by polling the backend.
///
/// At most one cycle runs per session id; a confirmed session can never be
/// polled again from the same poller.
pub struct PaymentPoller<B> {
    billing: Arc<B>,
    host: Arc<dyn PaymentHost>,
    config: PollConfig,
    sessions: Arc<DashMap<String, SessionSlot>>,
}

impl<B> PaymentPoller<B>
where
    B: BillingApi + 'static,
{
    /// A budget of zero attempts is raised to one; the first status check
    /// always runs.
    pub fn new(billing: Arc<B>, host: Arc<dyn PaymentHost>, mut config: PollConfig) -> Self {
        if config.max_attempts == 0 {
            warn!("Poll budget of 0 attempts raised to 1");
            config.max_attempts = 1;
        }
        Self {
            billing,
            host,
            config,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Inspects the page URL after a checkout redirect and starts polling if a
    /// session id is present. A cancelled checkout is acknowledged and its
    /// marker removed from the URL.
    pub fn resume<F>(&self, on_confirmed: F) -> Result<Option<PollHandle>, PollError>
    where
        F: FnOnce(&CheckoutSession) + Send + 'static,
    {
        let url = self.host.current_url();
        let params = ReturnParams::from_url(&url);

        if params.payment_cancelled {
            info!("Checkout was cancelled by the user");
            self.host
                .replace_url(strip_params(&url, &[PAYMENT_CANCELLED_PARAM]));
            self.host.notify(Notice::Info(CANCELLED_MESSAGE.into()));
            return Ok(None);
        }

        match params.checkout_session(&url) {
            Some(session) => self.start(session, on_confirmed).map(Some),
            None => Ok(None),
        }
    }

    pub fn start<F>(&self, session: CheckoutSession, on_confirmed: F) -> Result<PollHandle, PollError>
    where
        F: FnOnce(&CheckoutSession) + Send + 'static,
    {
        let session_id = session.session_id().to_owned();
        match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(slot) => {
                warn!(%session_id, "Refusing to start a second poll cycle");
                return Err(match slot.get() {
                    SessionSlot::Active => PollError::AlreadyPolling(session_id),
                    SessionSlot::Confirmed => PollError::AlreadyConfirmed(session_id),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(SessionSlot::Active);
            }
        }

        let token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState::Idle);

        let cycle = PollCycle {
            billing: self.billing.clone(),
            host: self.host.clone(),
            config: self.config,
            token: token.clone(),
            state_tx,
            slot: SlotGuard {
                sessions: self.sessions.clone(),
                session_id: session_id.clone(),
                confirmed: false,
            },
            session,
        };

        info!(%session_id, max_attempts = self.config.max_attempts, "Starting payment confirmation");
        let task = tokio::spawn(cycle.run(on_confirmed));

        Ok(PollHandle {
            session_id,
            state_rx,
            task,
            cancel: token.clone(),
            guard: token.drop_guard(),
        })
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|slot| matches!(*slot, SessionSlot::Active))
    }
}

/// Owner's handle on a running poll cycle. Dropping it cancels the cycle,
/// which is what a hosting view does when it goes away.
pub struct PollHandle {
    session_id: String,
    state_rx: watch::Receiver<PollState>,
    task: JoinHandle<PollState>,
    cancel: CancellationToken,
    guard: DropGuard,
}

impl PollHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> PollState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_rx.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the cycle to reach a terminal state.
    pub async fn join(self) -> PollState {
        let PollHandle { task, guard, .. } = self;
        let state = match task.await {
            Ok(state) => state,
            Err(e) => {
                error!("Payment poll task failed: {}", e);
                PollState::Aborted(AbortReason::Cancelled)
            }
        };
        let _ = guard.disarm();
        state
    }
}

/// Frees the session slot when a cycle ends, however it ends.
struct SlotGuard {
    sessions: Arc<DashMap<String, SessionSlot>>,
    session_id: String,
    confirmed: bool,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.confirmed {
            self.sessions
                .insert(self.session_id.clone(), SessionSlot::Confirmed);
        } else {
            self.sessions.remove(&self.session_id);
        }
    }
}

#[derive(Debug)]
enum Settled {
    Paid,
    Expired,
}

#[derive(Debug)]
enum PollFailure {
    StillPending,
    Status(ApiError),
    /// The backend reported the payment itself as failed.
    Errored,
}

/// Only `pending` earns another attempt.
fn classify(status: PaymentStatus) -> Result<Settled, PollFailure> {
    match status {
        PaymentStatus::Paid => Ok(Settled::Paid),
        PaymentStatus::Expired => Ok(Settled::Expired),
        PaymentStatus::Pending => Err(PollFailure::StillPending),
        PaymentStatus::Error => Err(PollFailure::Errored),
    }
}

struct PollCycle<B> {
    billing: Arc<B>,
    host: Arc<dyn PaymentHost>,
    config: PollConfig,
    token: CancellationToken,
    state_tx: watch::Sender<PollState>,
    slot: SlotGuard,
    session: CheckoutSession,
}

impl<B: BillingApi> PollCycle<B> {
    async fn run<F>(mut self, on_confirmed: F) -> PollState
    where
        F: FnOnce(&CheckoutSession),
    {
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            result = self.poll_until_settled() => Some(result),
        };

        // A response that lands after cancellation is dropped.
        let state = match result {
            Some(result) if !self.token.is_cancelled() => self.settle(result, on_confirmed).await,
            _ => {
                info!(session_id = %self.session.session_id(), "Payment confirmation cancelled");
                PollState::Aborted(AbortReason::Cancelled)
            }
        };

        self.state_tx.send_replace(state.clone());
        state
    }

    async fn poll_until_settled(&self) -> Result<Settled, PollFailure> {
        let attempts = AtomicU32::new(0);
        let retries = self.config.max_attempts.saturating_sub(1) as usize;

        (|| self.poll_once(attempts.fetch_add(1, Ordering::SeqCst) + 1))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.config.interval)
                    .with_max_times(retries),
            )
            .when(|e| matches!(e, PollFailure::StillPending))
            .notify(|_, delay| debug!(?delay, "Payment still pending"))
            .await
    }

    async fn poll_once(&self, attempt_number: u32) -> Result<Settled, PollFailure> {
        let attempt = PollAttempt::new(self.session.session_id(), attempt_number);
        self.state_tx.send_replace(PollState::Polling {
            session_id: attempt.session_id.to_owned(),
            attempt: attempt.attempt_number,
        });
        debug!(
            session_id = %attempt.session_id,
            attempt = attempt.attempt_number,
            scheduled_at = %attempt.scheduled_at,
            "Checking payment status"
        );

        let body = self
            .billing
            .checkout_status(attempt.session_id)
            .await
            .map_err(PollFailure::Status)?;

        classify(body.payment_status())
    }

    async fn settle<F>(&mut self, result: Result<Settled, PollFailure>, on_confirmed: F) -> PollState
    where
        F: FnOnce(&CheckoutSession),
    {
        let session_id = self.session.session_id();
        match result {
            Ok(Settled::Paid) => {
                info!(%session_id, "Payment confirmed");
                self.slot.confirmed = true;

                let url = self.host.current_url();
                self.host.replace_url(strip_params(
                    &url,
                    &[SESSION_ID_PARAM, PAYMENT_SUCCESS_PARAM],
                ));
                if let Err(e) = self.host.refresh_subscription().await {
                    warn!(%session_id, "Failed to refresh subscription after payment: {}", e);
                }
                on_confirmed(&self.session);
                self.host.notify(Notice::Success(CONFIRMED_MESSAGE.into()));
                PollState::Confirmed
            }
            Ok(Settled::Expired) => {
                info!(%session_id, "Checkout session expired");
                self.host.notify(Notice::Error(EXPIRED_MESSAGE.into()));
                PollState::Expired
            }
            Err(PollFailure::StillPending) => {
                warn!(
                    %session_id,
                    attempts = self.config.max_attempts,
                    "Payment still pending after all attempts"
                );
                self.host
                    .notify(Notice::Info(FlowError::TimeoutExhausted.user_message()));
                PollState::Aborted(AbortReason::TimedOut)
            }
            Err(PollFailure::Errored) => {
                error!(%session_id, "Backend reported the payment as failed");
                self.host.notify(Notice::Error(STATUS_ERROR_MESSAGE.into()));
                PollState::Aborted(AbortReason::Transport(PaymentStatus::Error.to_string()))
            }
            Err(PollFailure::Status(e)) => {
                error!(%session_id, "Failed to check payment status: {}", e);
                self.host.notify(Notice::Error(STATUS_ERROR_MESSAGE.into()));
                PollState::Aborted(AbortReason::Transport(e.reason()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_retried() {
        assert!(matches!(
            classify(PaymentStatus::Pending),
            Err(PollFailure::StillPending)
        ));
        assert!(matches!(
            classify(PaymentStatus::Error),
            Err(PollFailure::Errored)
        ));
        assert!(matches!(classify(PaymentStatus::Paid), Ok(Settled::Paid)));
        assert!(matches!(
            classify(PaymentStatus::Expired),
            Ok(Settled::Expired)
        ));
    }
}
