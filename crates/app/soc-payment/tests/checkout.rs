mod common;

use std::sync::Arc;

use common::{FakeHost, ScriptedBilling};
use flow_core::FlowError;
use soc_endpoint::ApiError;
use soc_payment::{CheckoutInitiator, CheckoutRequest, CheckoutResponse, Notice};

#[tokio::test]
async fn redirects_to_checkout_with_page_origin() {
    let billing = Arc::new(ScriptedBilling::new(vec![]));
    let host = FakeHost::at("https://app.example.com/pricing?plan=pro");

    let url = CheckoutInitiator::new(billing.clone(), host.clone())
        .start("pro_monthly")
        .await
        .unwrap();

    assert_eq!(url.as_str(), "https://checkout.stripe.com/c/pay/cs_test_abc");
    assert_eq!(host.assigned.lock().unwrap().as_slice(), &[url]);
    assert_eq!(
        billing.checkout_requests.lock().unwrap().as_slice(),
        &[CheckoutRequest {
            package_id: "pro_monthly".into(),
            origin_url: "https://app.example.com".into(),
        }]
    );
    assert!(host.notices().is_empty());
}

#[tokio::test]
async fn backend_detail_is_surfaced_without_redirect() {
    let billing = Arc::new(
        ScriptedBilling::new(vec![]).with_checkout_response(Err(ApiError::Status {
            status: 400,
            detail: Some("Invalid package".into()),
        })),
    );
    let host = FakeHost::at("https://app.example.com/pricing");

    let err = CheckoutInitiator::new(billing, host.clone())
        .start("gold")
        .await
        .unwrap_err();

    assert_eq!(err, FlowError::External("Invalid package".into()));
    assert!(host.assigned.lock().unwrap().is_empty());
    assert_eq!(host.notices(), vec![Notice::Error("Invalid package".into())]);
}

#[tokio::test]
async fn missing_detail_uses_generic_message() {
    let billing = Arc::new(
        ScriptedBilling::new(vec![]).with_checkout_response(Err(ApiError::Status {
            status: 502,
            detail: None,
        })),
    );
    let host = FakeHost::at("https://app.example.com/pricing");

    CheckoutInitiator::new(billing, host.clone())
        .start("pro_monthly")
        .await
        .unwrap_err();

    assert_eq!(
        host.notices(),
        vec![Notice::Error("Failed to start checkout".into())]
    );
    assert!(host.assigned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_checkout_url_is_not_followed() {
    let billing = Arc::new(ScriptedBilling::new(vec![]).with_checkout_response(Ok(
        CheckoutResponse {
            url: "not a url".into(),
            session_id: None,
        },
    )));
    let host = FakeHost::at("https://app.example.com/pricing");

    let result = CheckoutInitiator::new(billing, host.clone())
        .start("pro_monthly")
        .await;

    assert!(result.is_err());
    assert!(host.assigned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_package_id_makes_no_request() {
    let billing = Arc::new(ScriptedBilling::new(vec![]));
    let host = FakeHost::at("https://app.example.com/pricing");

    let err = CheckoutInitiator::new(billing.clone(), host.clone())
        .start("  ")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Validation(_)));
    assert!(billing.checkout_requests.lock().unwrap().is_empty());
    assert!(host.assigned.lock().unwrap().is_empty());
}
