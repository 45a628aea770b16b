#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use marketplace_api::{
    build_router,
    config::{Config, DatabaseConfig, JwtConfig, LogConfig, ServerConfig, StripeConfig},
    models::{Booking, Role, User, VerificationStatus},
    services::{InMemoryStore, MockGateway, TokenService},
    AppState,
};
use marketplace_core::observability::LogFormat;
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-signing-key";
pub const ADMIN_EMAIL: &str = "a@x.com";
pub const BUYER_EMAIL: &str = "buyer@x.com";

pub fn test_config() -> Config {
    Config {
        service_name: "marketplace-api-test".to_string(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origins: vec![],
        },
        database: DatabaseConfig {
            url: Secret::new("mongodb://localhost:27017".to_string()),
            db_name: "marketplace_test".to_string(),
            transactions: false,
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_SECRET.to_string()),
            expiry_minutes: 60,
        },
        stripe: StripeConfig {
            secret_key: Secret::new("sk_test_123".to_string()),
            api_base_url: "http://localhost:12111/v1".to_string(),
            currency: "usd".to_string(),
            timeout_seconds: 5,
            verify_charges: false,
        },
        log: LogConfig {
            level: "error".to_string(),
            format: LogFormat::Pretty,
            otlp_endpoint: None,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub tokens: TokenService,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with(test_config(), InMemoryStore::new())
    }

    pub fn with(config: Config, store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        let gateway = Arc::new(MockGateway::new());
        let tokens = TokenService::new(&config.jwt);
        let state = AppState::new(config, store.clone(), gateway.clone());

        Self {
            router: build_router(state),
            store,
            gateway,
            tokens,
        }
    }

    pub fn seed_user(&self, id: &str, email: &str, role: Role) {
        self.store.seed_user(User {
            id: id.to_string(),
            email: email.to_string(),
            name: None,
            role,
            verification_status: VerificationStatus::Unverified,
        });
    }

    pub fn seed_booking(&self, id: &str, email: &str, price: f64) {
        self.store.seed_booking(Booking {
            id: id.to_string(),
            email: email.to_string(),
            product_ref: "P1".to_string(),
            product_name: Some("Sedan".to_string()),
            price,
            paid: false,
            transaction_id: None,
            intent_id: None,
        });
    }

    pub fn token_for(&self, email: &str) -> String {
        self.tokens.issue(email).expect("failed to issue test token")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, bearer, None).await
    }

    pub async fn post(&self, uri: &str, bearer: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, bearer, Some(body)).await
    }

    pub async fn put(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        self.send(Method::PUT, uri, bearer, None).await
    }

    pub async fn delete(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, bearer, None).await
    }
}
