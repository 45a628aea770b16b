mod common;

use axum::http::StatusCode;
use common::TestApp;
use marketplace_core::middleware::REQUEST_ID_HEADER;

#[tokio::test]
async fn root_reports_running() {
    let app = TestApp::spawn();

    let response = app.get("/", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "server is running");
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn();

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "ok");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn();

    let response = app.get("/health", None).await;

    assert!(response.headers.contains_key(REQUEST_ID_HEADER));
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn catalog_routes_return_stored_listings() {
    let app = TestApp::spawn();
    app.store.seed_category(marketplace_api::models::Category {
        id: "c1".to_string(),
        name: "SUV".to_string(),
        image: None,
    });

    let created = app
        .post(
            "/products",
            None,
            serde_json::json!({
                "name": "Jeep",
                "category_id": "c1",
                "email": "seller@x.com",
                "price": 12000,
                "location": "Dhaka"
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let categories = app.get("/categories", None).await;
    assert_eq!(categories.json()[0]["name"], "SUV");

    let in_category = app.get("/categories/c1", None).await;
    assert_eq!(in_category.json()[0]["name"], "Jeep");

    let by_seller = app.get("/sellerproducts/email/seller@x.com", None).await;
    assert_eq!(by_seller.json().as_array().unwrap().len(), 1);

    let other = app.get("/categories/c2", None).await;
    assert!(other.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::spawn();

    let response = app.get("/wishlist", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
