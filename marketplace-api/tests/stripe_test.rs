mod common;

use marketplace_api::services::{GatewayError, PaymentGateway, StripeClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> StripeClient {
    let mut config = common::test_config().stripe;
    config.api_base_url = format!("{}/v1", server.uri());
    StripeClient::new(config).unwrap()
}

#[tokio::test]
async fn create_intent_posts_minor_units_as_a_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=5000"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("payment_method_types%5B%5D=card"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 5000,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let intent = client_for(&server).create_intent(5000, "usd").await.unwrap();

    assert_eq!(intent.id, "pi_123");
    assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
    assert_eq!(intent.amount, 5000);
}

#[tokio::test]
async fn stripe_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "amount_too_small",
                "message": "Amount must be at least $0.50 usd"
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).create_intent(10, "usd").await.unwrap_err();

    match err {
        GatewayError::Rejected { code, message } => {
            assert_eq!(code, "amount_too_small");
            assert!(message.contains("at least"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_error_body_still_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = client_for(&server).create_intent(5000, "usd").await.unwrap_err();

    assert!(matches!(err, GatewayError::Rejected { ref code, .. } if code == "500"));
}

#[tokio::test]
async fn retrieve_intent_reads_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "amount": 5000,
            "currency": "usd",
            "status": "succeeded",
            "client_secret": null
        })))
        .mount(&server)
        .await;

    let intent = client_for(&server).retrieve_intent("pi_123").await.unwrap();

    assert!(intent.is_succeeded());
    assert_eq!(intent.amount, 5000);
}

#[tokio::test]
async fn retrieve_intent_keeps_the_id_inside_its_resource() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "object": "list" })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/payment_intents/[^/]+$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": "No such payment_intent"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .retrieve_intent("../customers")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Rejected { ref code, .. } if code == "resource_missing"));
}
