//! Stripe payment intents client.
//!
//! Only the two calls the checkout flow needs: create a card-payable intent
//! and fetch one back to confirm a reported charge.

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::config::StripeConfig;

pub const STATUS_SUCCEEDED: &str = "succeeded";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Stripe credentials not configured")]
    NotConfigured,

    #[error("Stripe request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Stripe error: {code} - {message}")]
    Rejected { code: String, message: String },

    #[error("Invalid Stripe endpoint: {0}")]
    Endpoint(String),

    #[error("Unexpected Stripe response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A gateway-side pending charge.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == STATUS_SUCCEEDED
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Resolve `segments` under the API base. Each segment is escaped, so a
    /// caller-supplied id cannot climb out of its resource.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.config.api_base_url)
            .map_err(|e| GatewayError::Endpoint(format!("{}: {}", self.config.api_base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Endpoint(self.config.api_base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_intent(&self, response: reqwest::Response) -> Result<PaymentIntent, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe response received");

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let (code, message) = match serde_json::from_str::<StripeErrorBody>(&body) {
            Ok(err) => (
                err.error
                    .code
                    .or(err.error.kind)
                    .unwrap_or_else(|| status.as_u16().to_string()),
                err.error.message.unwrap_or_default(),
            ),
            Err(_) => (status.as_u16().to_string(), body),
        };
        tracing::error!(code = %code, message = %message, "Stripe request rejected");
        Err(GatewayError::Rejected { code, message })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }

        let amount = amount_minor.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .client
            .post(self.endpoint(&["payment_intents"])?)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let intent = self.read_intent(response).await?;
        tracing::info!(
            intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "Stripe payment intent created"
        );
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }

        if matches!(intent_id, "" | "." | "..") {
            return Err(GatewayError::Rejected {
                code: "invalid_intent_id".to_string(),
                message: format!("'{}' is not a payment intent id", intent_id),
            });
        }

        let response = self
            .client
            .get(self.endpoint(&["payment_intents", intent_id])?)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        self.read_intent(response).await
    }
}

/// Gateway stand-in for tests and local runs.
#[derive(Default)]
pub struct MockGateway {
    failing: AtomicBool,
    counter: AtomicU64,
    calls: Mutex<Vec<(i64, String)>>,
    intents: Mutex<HashMap<String, PaymentIntent>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if Stripe rejected it.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `(amount_minor, currency)` of every intent requested so far.
    pub fn calls(&self) -> Vec<(i64, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Register a completed charge that `retrieve_intent` will return.
    pub fn record_succeeded(&self, intent_id: &str, amount_minor: i64, currency: &str) {
        if let Ok(mut intents) = self.intents.lock() {
            intents.insert(
                intent_id.to_string(),
                PaymentIntent {
                    id: intent_id.to_string(),
                    client_secret: None,
                    amount: amount_minor,
                    currency: currency.to_string(),
                    status: STATUS_SUCCEEDED.to_string(),
                },
            );
        }
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                code: "api_error".to_string(),
                message: "Mock gateway is failing".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.check()?;

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((amount_minor, currency.to_string()));
        }

        let id = format!("pi_mock_{}", n);
        tracing::info!(intent_id = %id, amount = amount_minor, "[MOCK] Payment intent created");

        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret_{}", id, n)),
            id: id.clone(),
            amount: amount_minor,
            currency: currency.to_string(),
            status: "requires_payment_method".to_string(),
        };
        if let Ok(mut intents) = self.intents.lock() {
            intents.insert(id, intent.clone());
        }
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.check()?;
        self.intents
            .lock()
            .ok()
            .and_then(|intents| intents.get(intent_id).cloned())
            .ok_or_else(|| GatewayError::Rejected {
                code: "resource_missing".to_string(),
                message: format!("No such payment_intent: '{}'", intent_id),
            })
    }
}
