pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use marketplace_core::middleware::{
    request_id_middleware, request_metrics_middleware, security_headers_middleware,
    REQUEST_ID_HEADER,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use config::Config;
use handlers::{auth, bookings, catalog, payments, users};
use middleware::{admin_only, require_authenticated};
use services::{
    BookingStore, Catalog, MongoStore, PaymentGateway, PaymentLedger, PaymentOrchestrator,
    TokenService, UserDirectory,
};

pub use startup::Application;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub users: Arc<dyn UserDirectory>,
    pub bookings: Arc<dyn BookingStore>,
    pub catalog: Arc<dyn Catalog>,
    pub payments: PaymentOrchestrator,
    /// Pinged by `/health` when present.
    pub database: Option<MongoStore>,
}

impl AppState {
    pub fn new<S>(config: Config, store: Arc<S>, gateway: Arc<dyn PaymentGateway>) -> Self
    where
        S: UserDirectory + BookingStore + PaymentLedger + Catalog + 'static,
    {
        let payments = PaymentOrchestrator::new(
            store.clone(),
            store.clone(),
            gateway,
            config.stripe.currency.clone(),
            config.stripe.verify_charges,
        );

        Self {
            tokens: TokenService::new(&config.jwt),
            users: store.clone(),
            bookings: store.clone(),
            catalog: store,
            payments,
            config: Arc::new(config),
            database: None,
        }
    }

    pub fn with_database(mut self, database: MongoStore) -> Self {
        self.database = Some(database);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    // Token first, then the admin lookup. Layers run bottom-up.
    let admin = Router::new()
        .route("/users/admin/:id", put(users::make_admin))
        .route("/users/verify/:id", put(users::verify_user))
        .route("/admin/delete/:id", delete(users::delete_user))
        .route("/users/delete/:id", delete(users::delete_user))
        .route("/products/admin/delete/:id", delete(catalog::delete_product))
        .route("/payments/reconcile", post(payments::reconcile))
        .route_layer(from_fn_with_state(state.clone(), admin_only))
        .route_layer(from_fn_with_state(state.clone(), require_authenticated));

    let protected = Router::new()
        .route("/bookings", get(bookings::list_bookings))
        .route("/deletebookings/:id", delete(bookings::delete_booking))
        .route_layer(from_fn_with_state(state.clone(), require_authenticated));

    // `/users/admin/:id` shares its pattern with the admin PUT; the segment is an email here.
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/jwt", get(auth::issue_token))
        .route("/users", post(users::create_user))
        .route("/users/admin/:id", get(users::is_admin))
        .route("/users/seller/:email", get(users::is_seller))
        .route("/users/buyer/:email", get(users::is_buyer))
        .route("/admin", get(users::list_admins))
        .route("/sellers", get(users::list_sellers))
        .route("/buyers", get(users::list_buyers))
        .route("/categories", get(catalog::list_categories))
        .route("/categories/:id", get(catalog::category_products))
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/sellerproducts/email/:email", get(catalog::seller_products))
        .route("/bookings", post(bookings::create_booking))
        .route("/create-payment-intent", post(payments::create_payment_intent))
        .route(
            "/payments",
            get(payments::list_payments).post(payments::confirm_payment),
        );

    let cors = cors_layer(&state.config.server.allowed_origins);

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .layer(from_fn(request_metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}", origin, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
