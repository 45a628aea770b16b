mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use common::{TestApp, ADMIN_EMAIL, BUYER_EMAIL, TEST_SECRET};
use jsonwebtoken::{encode, EncodingKey, Header};
use marketplace_api::{models::Role, services::IdentityClaim};

#[tokio::test]
async fn registered_email_receives_a_token() {
    let app = TestApp::spawn();
    app.seed_user("u1", BUYER_EMAIL, Role::Buyer);

    let response = app.get(&format!("/jwt?email={}", BUYER_EMAIL), None).await;

    assert_eq!(response.status, StatusCode::OK);
    let token = response.json()["accessToken"].as_str().unwrap().to_string();
    let claim = app.tokens.verify(&token).unwrap();
    assert_eq!(claim.email, BUYER_EMAIL);
}

#[tokio::test]
async fn unregistered_email_gets_an_empty_token() {
    let app = TestApp::spawn();
    app.seed_user("u1", BUYER_EMAIL, Role::Buyer);

    for email in ["nobody@x.com", "BUYER@x.com", ""] {
        let response = app.get(&format!("/jwt?email={}", email), None).await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.json(), serde_json::json!({ "accessToken": "" }));
    }
}

#[tokio::test]
async fn missing_header_is_unauthorized_plain_text() {
    let app = TestApp::spawn();
    app.seed_user("123", BUYER_EMAIL, Role::Buyer);

    let response = app.put("/users/admin/123", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.text(), "unauthorized access");
    assert!(response.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(app.store.user("123").unwrap().role, Role::Buyer);
}

#[tokio::test]
async fn invalid_token_is_forbidden() {
    let app = TestApp::spawn();
    app.seed_user("u1", ADMIN_EMAIL, Role::Admin);

    let response = app.get("/bookings?email=a@x.com", Some("not-a-token")).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.json(),
        serde_json::json!({ "message": "forbidden access" })
    );
}

#[tokio::test]
async fn non_bearer_header_is_forbidden() {
    let app = TestApp::spawn();
    let token = app.token_for(BUYER_EMAIL);

    let request = Request::builder()
        .uri(format!("/bookings?email={}", BUYER_EMAIL))
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.send_request(request).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_token_is_forbidden() {
    let app = TestApp::spawn();
    let past = Utc::now().timestamp() - 7200;
    let claim = IdentityClaim {
        email: BUYER_EMAIL.to_string(),
        iat: past,
        exp: past + 3600,
    };
    let token = encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app
        .get(&format!("/bookings?email={}", BUYER_EMAIL), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_signed_with_another_key_is_forbidden() {
    let app = TestApp::spawn();
    let claim = IdentityClaim {
        email: ADMIN_EMAIL.to_string(),
        iat: Utc::now().timestamp(),
        exp: Utc::now().timestamp() + 3600,
    };
    let forged = encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(b"someone-elses-key"),
    )
    .unwrap();

    let response = app
        .get(&format!("/bookings?email={}", ADMIN_EMAIL), Some(&forged))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn own_bookings_are_listed() {
    let app = TestApp::spawn();
    app.seed_booking("B1", BUYER_EMAIL, 50.0);
    app.seed_booking("B2", "other@x.com", 75.0);
    let token = app.token_for(BUYER_EMAIL);

    let response = app
        .get(&format!("/bookings?email={}", BUYER_EMAIL), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let bookings = response.json();
    assert_eq!(bookings.as_array().unwrap().len(), 1);
    assert_eq!(bookings[0]["_id"], "B1");
}

#[tokio::test]
async fn another_users_bookings_are_forbidden() {
    let app = TestApp::spawn();
    app.seed_booking("B2", "other@x.com", 75.0);
    let token = app.token_for(BUYER_EMAIL);

    let response = app.get("/bookings?email=other@x.com", Some(&token)).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owner_can_delete_an_unpaid_booking() {
    let app = TestApp::spawn();
    app.seed_booking("B1", BUYER_EMAIL, 50.0);
    let token = app.token_for(BUYER_EMAIL);

    let response = app.delete("/deletebookings/B1", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["deletedCount"], 1);
    assert!(app.store.booking("B1").is_none());
}

#[tokio::test]
async fn another_users_booking_cannot_be_deleted() {
    let app = TestApp::spawn();
    app.seed_booking("B1", BUYER_EMAIL, 50.0);
    let token = app.token_for("stranger@x.com");

    let response = app.delete("/deletebookings/B1", Some(&token)).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(app.store.booking("B1").is_some());
}

#[tokio::test]
async fn paid_booking_cannot_be_deleted() {
    let app = TestApp::spawn();
    app.seed_booking("B1", BUYER_EMAIL, 50.0);
    let paid = app
        .post(
            "/payments",
            None,
            serde_json::json!({
                "bookingId": "B1",
                "email": BUYER_EMAIL,
                "amount": 50,
                "transactionId": "T1"
            }),
        )
        .await;
    assert_eq!(paid.status, StatusCode::OK);
    let token = app.token_for(BUYER_EMAIL);

    let response = app.delete("/deletebookings/B1", Some(&token)).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(app.store.booking("B1").unwrap().paid);
    assert_eq!(app.store.payments().len(), 1);
}

#[tokio::test]
async fn deleting_a_missing_booking_is_not_found() {
    let app = TestApp::spawn();
    let token = app.token_for(BUYER_EMAIL);

    let response = app.delete("/deletebookings/missing", Some(&token)).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
