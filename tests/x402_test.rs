mod common;

use common::*;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use streamertip_core::config::token::DEFAULT_TOKEN_ADDRESS;
use streamertip_core::x402::types::{encode_header, SCHEME_EXACT};
use streamertip_core::x402::{
    PaymentBudget, PaymentClient, PaymentClientError, PaymentEvent, PaymentRequirements, SettlementResponse,
    PAYMENT_RESPONSE_HEADER,
};

fn requirements(network: &str) -> PaymentRequirements {
    PaymentRequirements {
        scheme: SCHEME_EXACT.to_string(),
        network: network.to_string(),
        max_amount_required: "500000".to_string(),
        resource: "https://api.streamertip.app/tip".to_string(),
        description: "Tip".to_string(),
        mime_type: "application/json".to_string(),
        pay_to: STREAMER.to_string(),
        max_timeout_seconds: 60,
        asset: DEFAULT_TOKEN_ADDRESS.to_string(),
        extra: None,
    }
}

fn challenge_body(accepts: Vec<PaymentRequirements>) -> String {
    json!({
        "x402Version": 1,
        "accepts": accepts,
        "error": "X-PAYMENT header is required",
    })
    .to_string()
}

fn client(url: String, signer: Arc<FakeSigner>) -> PaymentClient {
    let budget = PaymentBudget {
        max_amount: 500_000,
        asset: DEFAULT_TOKEN_ADDRESS.parse().unwrap(),
    };
    PaymentClient::new(reqwest::Client::new(), url, signer, "base".to_string(), budget)
}

#[tokio::test]
async fn test_pays_and_retries_once() {
    let mut server = mockito::Server::new_async().await;
    let expected_header = encode_header(&payload_for(&requirements("base"))).unwrap();
    let settlement = SettlementResponse {
        success: true,
        transaction: HASH.to_string(),
        network: "base".to_string(),
        payer: Some(TIPPER.to_string()),
        error_reason: None,
    };

    let _unpaid = server
        .mock("POST", "/tip")
        .match_header("x-payment", mockito::Matcher::Missing)
        .with_status(402)
        .with_header("content-type", "application/json")
        .with_body(challenge_body(vec![
            requirements("base-sepolia"),
            requirements("base"),
        ]))
        .expect(1)
        .create_async()
        .await;
    let paid = server
        .mock("POST", "/tip")
        .match_header("x-payment", expected_header.as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header(PAYMENT_RESPONSE_HEADER, &encode_header(&settlement).unwrap())
        .with_body(r#"{"success":true}"#)
        .expect(1)
        .create_async()
        .await;

    let signer = Arc::new(FakeSigner::new(Outcome::Approve));
    let events = Mutex::new(Vec::new());
    let observer = |event: PaymentEvent| events.lock().unwrap().push(event);

    let response = client(server.url(), signer.clone())
        .post_json_observed("/tip", &json!({ "username": "ninja" }), &observer)
        .await
        .unwrap();

    paid.assert_async().await;
    assert!(response.paid);
    assert_eq!(response.status, 200);
    assert_eq!(response.settlement, Some(settlement));
    assert_eq!(response.body["success"], json!(true));
    assert_eq!(signer.signatures.load(Ordering::SeqCst), 1);

    let events = events.into_inner().unwrap();
    assert_eq!(
        events,
        vec![
            PaymentEvent::ChallengeReceived(requirements("base")),
            PaymentEvent::PaymentSigned
        ]
    );
}

#[tokio::test]
async fn test_free_endpoint_is_not_paid() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tip")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_header("x-transaction-hash", &HASH.to_string())
        .with_body("{}")
        .create_async()
        .await;

    let signer = Arc::new(FakeSigner::new(Outcome::Approve));
    let response = client(server.url(), signer.clone())
        .post_json("/tip", &json!({}))
        .await
        .unwrap();

    assert!(!response.paid);
    assert_eq!(response.tx_hash_header, Some(HASH.to_string()));
    assert!(response.settlement.is_none());
    assert_eq!(signer.signatures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_requirement_for_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tip")
        .with_status(402)
        .with_header("content-type", "application/json")
        .with_body(challenge_body(vec![requirements("polygon")]))
        .expect(1)
        .create_async()
        .await;

    let signer = Arc::new(FakeSigner::new(Outcome::Approve));
    let result = client(server.url(), signer.clone())
        .post_json("/tip", &json!({}))
        .await;

    mock.assert_async().await;
    assert!(matches!(result, Err(PaymentClientError::NoAcceptableRequirement(n)) if n == "base"));
    assert_eq!(signer.signatures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tip")
        .with_status(503)
        .with_body("upstream down")
        .expect(1)
        .create_async()
        .await;

    let result = client(server.url(), Arc::new(FakeSigner::new(Outcome::Approve)))
        .post_json("/tip", &json!({}))
        .await;

    mock.assert_async().await;
    match result {
        Err(PaymentClientError::Status { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream down");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.status)),
    }
}

#[tokio::test]
async fn test_rejected_signature_stops_before_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tip")
        .with_status(402)
        .with_header("content-type", "application/json")
        .with_body(challenge_body(vec![requirements("base")]))
        .expect(1)
        .create_async()
        .await;

    let result = client(server.url(), Arc::new(FakeSigner::new(Outcome::Reject)))
        .post_json("/tip", &json!({}))
        .await;

    mock.assert_async().await;
    assert!(matches!(result, Err(PaymentClientError::Signer(_))));
}

#[tokio::test]
async fn test_inflated_challenge_is_not_signed() {
    let mut server = mockito::Server::new_async().await;
    let mut inflated = requirements("base");
    inflated.max_amount_required = "1000000000000".to_string();
    let mut foreign_asset = requirements("base");
    foreign_asset.asset = "0x0000000000000000000000000000000000000001".to_string();

    let mock = server
        .mock("POST", "/tip")
        .with_status(402)
        .with_header("content-type", "application/json")
        .with_body(challenge_body(vec![inflated, foreign_asset]))
        .expect(1)
        .create_async()
        .await;

    let signer = Arc::new(FakeSigner::new(Outcome::Approve));
    let result = client(server.url(), signer.clone())
        .post_json("/tip", &json!({}))
        .await;

    mock.assert_async().await;
    assert!(matches!(
        result,
        Err(PaymentClientError::OverBudget { max_amount: 500_000 })
    ));
    assert_eq!(signer.signatures.load(Ordering::SeqCst), 0);
}
