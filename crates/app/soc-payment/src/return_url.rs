use flow_core::{CheckoutSession, Origin};
use url::Url;

pub(crate) const SESSION_ID_PARAM: &str = "session_id";
pub(crate) const PAYMENT_SUCCESS_PARAM: &str = "payment_success";
pub(crate) const PAYMENT_CANCELLED_PARAM: &str = "payment_cancelled";

/// Query parameters the checkout page appends when it sends the user back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnParams {
    pub session_id: Option<String>,
    pub payment_success: bool,
    pub payment_cancelled: bool,
}

impl ReturnParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = ReturnParams::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                SESSION_ID_PARAM if !value.is_empty() => {
                    params.session_id = Some(value.into_owned());
                }
                PAYMENT_SUCCESS_PARAM => params.payment_success = is_truthy(&value),
                PAYMENT_CANCELLED_PARAM => params.payment_cancelled = is_truthy(&value),
                _ => {}
            }
        }
        params
    }

    /// The checkout session this return refers to, bound to the page's origin.
    pub fn checkout_session(&self, url: &Url) -> Option<CheckoutSession> {
        let session_id = self.session_id.as_ref()?;
        let origin = Origin::of(url).ok()?;
        Some(CheckoutSession::new(session_id.clone(), origin))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "true" | "1")
}

/// Copy of `url` without the named query parameters. Order of the remaining
/// parameters is preserved and an empty query is dropped entirely.
pub(crate) fn strip_params(url: &Url, names: &[&str]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !names.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
