//! Checkout flow: gateway intent, then payment record plus booking settlement.

use std::sync::Arc;

use crate::models::{new_id, Payment};
use crate::services::error::MarketplaceError;
use crate::services::store::{BookingStore, InsertOutcome, PaymentLedger, StoreError};
use crate::services::stripe::{GatewayError, PaymentGateway};

/// What the client reports after completing a charge out-of-band.
#[derive(Debug, Clone)]
pub struct PaymentReport {
    pub booking_id: String,
    pub email: String,
    pub amount: f64,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedIntent {
    pub intent_id: String,
    pub client_secret: String,
}

/// Outcome of a reconciliation sweep.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub examined: usize,
    pub settled: usize,
    pub failed: usize,
}

/// Convert a major-unit price to the gateway's minor units.
pub fn to_minor_units(price: f64) -> Result<i64, MarketplaceError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(MarketplaceError::BadRequest(format!(
            "Price must be a positive amount, got {}",
            price
        )));
    }

    let minor = (price * 100.0).round();
    if minor < 1.0 || minor > i64::MAX as f64 {
        return Err(MarketplaceError::BadRequest(format!(
            "Price {} is out of range",
            price
        )));
    }
    Ok(minor as i64)
}

#[derive(Clone)]
pub struct PaymentOrchestrator {
    bookings: Arc<dyn BookingStore>,
    ledger: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
    default_currency: String,
    verify_charges: bool,
}

impl PaymentOrchestrator {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        ledger: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn PaymentGateway>,
        default_currency: impl Into<String>,
        verify_charges: bool,
    ) -> Self {
        Self {
            bookings,
            ledger,
            gateway,
            default_currency: default_currency.into(),
            verify_charges,
        }
    }

    /// Ask the gateway for a card-payable intent and hand back its client secret.
    ///
    /// With a `booking_id` the booking must exist and be unpaid; it records the
    /// intent id once the gateway has accepted. A gateway failure persists nothing.
    pub async fn create_intent(
        &self,
        price: f64,
        currency: Option<&str>,
        booking_id: Option<&str>,
    ) -> Result<CreatedIntent, MarketplaceError> {
        let amount = to_minor_units(price)?;
        let currency = currency
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.default_currency.clone());

        if let Some(booking_id) = booking_id {
            let booking = self
                .bookings
                .find_by_id(booking_id)
                .await?
                .ok_or_else(|| MarketplaceError::NotFound(format!("Booking {} not found", booking_id)))?;
            if booking.paid {
                return Err(MarketplaceError::Conflict(format!(
                    "Booking {} is already paid",
                    booking_id
                )));
            }
        }

        let intent = match self.gateway.create_intent(amount, &currency).await {
            Ok(intent) => intent,
            Err(e) => {
                metrics::counter!("payment_intents_total", "status" => "failed").increment(1);
                tracing::error!(amount, currency = %currency, error = %e, "Payment intent creation failed");
                return Err(e.into());
            }
        };
        metrics::counter!("payment_intents_total", "status" => "created").increment(1);

        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            MarketplaceError::PaymentGateway(GatewayError::Rejected {
                code: "missing_client_secret".to_string(),
                message: format!("Intent {} has no client secret", intent.id),
            })
        })?;

        if let Some(booking_id) = booking_id {
            let outcome = self.bookings.record_intent(booking_id, &intent.id).await?;
            if outcome.matched_count == 0 {
                tracing::warn!(
                    booking_id = %booking_id,
                    intent_id = %intent.id,
                    "Booking changed before the intent could be recorded"
                );
            }
        }

        tracing::info!(intent_id = %intent.id, amount, currency = %currency, "Payment intent issued");
        Ok(CreatedIntent {
            intent_id: intent.id,
            client_secret,
        })
    }

    /// Record a reported charge and mark its booking paid.
    pub async fn confirm_payment(
        &self,
        report: PaymentReport,
    ) -> Result<InsertOutcome, MarketplaceError> {
        let booking = self
            .bookings
            .find_by_id(&report.booking_id)
            .await?
            .ok_or_else(|| {
                MarketplaceError::NotFound(format!("Booking {} not found", report.booking_id))
            })?;
        if booking.paid {
            return Err(MarketplaceError::Conflict(format!(
                "Booking {} is already paid",
                report.booking_id
            )));
        }

        if let Some(recorded) = self.ledger.payment_for_booking(&report.booking_id).await? {
            return self.resume_settlement(recorded, &report.transaction_id).await;
        }

        if self.verify_charges {
            self.verify_charge(&report).await?;
        }

        let payment = Payment {
            id: new_id(),
            booking_id: report.booking_id,
            email: report.email,
            amount: report.amount,
            transaction_id: report.transaction_id,
        };

        if let Some(outcome) = self.ledger.settle_atomically(&payment).await? {
            metrics::counter!("payments_confirmed_total", "mode" => "transaction").increment(1);
            tracing::info!(
                payment_id = %payment.id,
                booking_id = %payment.booking_id,
                "Payment settled in one transaction"
            );
            return Ok(outcome);
        }

        let outcome = self.ledger.insert_payment(&payment).await?;
        self.settle_booking(&payment).await?;

        metrics::counter!("payments_confirmed_total", "mode" => "sequential").increment(1);
        tracing::info!(
            payment_id = %payment.id,
            booking_id = %payment.booking_id,
            "Payment recorded and booking settled"
        );
        Ok(outcome)
    }

    /// A payment is already on file for an unpaid booking: a retry after a
    /// failed settlement. Only the same charge may finish it.
    async fn resume_settlement(
        &self,
        recorded: Payment,
        transaction_id: &str,
    ) -> Result<InsertOutcome, MarketplaceError> {
        if recorded.transaction_id != transaction_id {
            return Err(MarketplaceError::Conflict(format!(
                "Booking {} already has payment {} for another charge",
                recorded.booking_id, recorded.id
            )));
        }

        self.settle_booking(&recorded).await?;

        metrics::counter!("payments_confirmed_total", "mode" => "resumed").increment(1);
        tracing::info!(
            payment_id = %recorded.id,
            booking_id = %recorded.booking_id,
            "Settlement resumed for recorded payment"
        );
        Ok(InsertOutcome::new(recorded.id))
    }

    async fn settle_booking(&self, payment: &Payment) -> Result<(), MarketplaceError> {
        let settled = self
            .ledger
            .mark_booking_paid(&payment.booking_id, &payment.transaction_id)
            .await
            .and_then(|update| {
                if update.matched_count == 0 {
                    Err(StoreError::Backend(anyhow::anyhow!(
                        "booking {} no longer exists",
                        payment.booking_id
                    )))
                } else {
                    Ok(update)
                }
            });

        if let Err(source) = settled {
            metrics::counter!("payments_confirmed_total", "mode" => "unsettled").increment(1);
            return Err(MarketplaceError::ConsistencyGap {
                payment_id: payment.id.clone(),
                booking_id: payment.booking_id.clone(),
                source,
            });
        }
        Ok(())
    }

    async fn verify_charge(&self, report: &PaymentReport) -> Result<(), MarketplaceError> {
        let intent = self.gateway.retrieve_intent(&report.transaction_id).await?;
        let expected = to_minor_units(report.amount)?;

        if !intent.is_succeeded() {
            return Err(MarketplaceError::BadRequest(format!(
                "Charge {} has not succeeded (status {})",
                intent.id, intent.status
            )));
        }
        if intent.amount != expected {
            return Err(MarketplaceError::BadRequest(format!(
                "Charge {} is for {} minor units, reported {}",
                intent.id, intent.amount, expected
            )));
        }
        Ok(())
    }

    /// Replay booking settlement for every payment whose booking is not marked paid.
    pub async fn reconcile(&self) -> Result<ReconcileReport, MarketplaceError> {
        let pending = self.ledger.unsettled_payments().await?;
        let mut report = ReconcileReport {
            examined: pending.len(),
            ..ReconcileReport::default()
        };

        for payment in pending {
            match self
                .ledger
                .mark_booking_paid(&payment.booking_id, &payment.transaction_id)
                .await
            {
                Ok(update) if update.matched_count > 0 => report.settled += 1,
                Ok(_) => {
                    tracing::warn!(
                        payment_id = %payment.id,
                        booking_id = %payment.booking_id,
                        "Payment references a missing booking"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(
                        payment_id = %payment.id,
                        booking_id = %payment.booking_id,
                        error = %e,
                        "Booking settlement replay failed"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                settled = report.settled,
                failed = report.failed,
                "Payment reconciliation finished"
            );
        }
        Ok(report)
    }

    pub async fn payments_for(&self, email: &str) -> Result<Vec<Payment>, MarketplaceError> {
        Ok(self.ledger.payments_for_email(email).await?)
    }
}
