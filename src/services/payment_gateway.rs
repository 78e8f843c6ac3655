//! Payment gateway seam.
//!
//! The client pays through the gateway's popup; the server registers the
//! expected amount up front, then verifies (or cancels) the payment by its key.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("payment {0} not found")]
    NotFound(String),
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub payment_key: String,
    pub merchant_uid: String,
    pub amount: Decimal,
}

#[rocket::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register the amount the gateway should expect for `merchant_uid`.
    async fn prepare(&self, merchant_uid: &str, amount: Decimal) -> GatewayResult<()>;

    /// Look up a completed payment.
    async fn verify(&self, payment_key: &str, merchant_uid: &str) -> GatewayResult<GatewayPayment>;

    /// Cancel (refund) a payment in full.
    async fn cancel(&self, payment_key: &str, reason: &str) -> GatewayResult<()>;
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Approve,
    PaidAmount(Decimal),
    Decline(String),
}

/// In-memory gateway for development and tests.
///
/// Approves every prepared order with the prepared amount unless told otherwise.
/// A payment key belongs to the first order it is verified for.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    prepared: RwLock<HashMap<String, Decimal>>,
    outcomes: RwLock<HashMap<String, MockOutcome>>,
    // payment key -> merchant uid
    payments: RwLock<HashMap<String, String>>,
    cancelled: RwLock<Vec<String>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<MockPaymentGateway> {
        Arc::new(Self::new())
    }

    /// Simulate the customer paying a different amount than prepared.
    pub async fn set_paid_amount(&self, merchant_uid: &str, amount: Decimal) {
        self.outcomes
            .write()
            .await
            .insert(merchant_uid.to_string(), MockOutcome::PaidAmount(amount));
    }

    pub async fn decline(&self, merchant_uid: &str, reason: &str) {
        self.outcomes
            .write()
            .await
            .insert(merchant_uid.to_string(), MockOutcome::Decline(reason.to_string()));
    }

    pub async fn cancelled_keys(&self) -> Vec<String> {
        self.cancelled.read().await.clone()
    }
}

#[rocket::async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn prepare(&self, merchant_uid: &str, amount: Decimal) -> GatewayResult<()> {
        self.prepared
            .write()
            .await
            .insert(merchant_uid.to_string(), amount);
        Ok(())
    }

    async fn verify(&self, payment_key: &str, merchant_uid: &str) -> GatewayResult<GatewayPayment> {
        let paid_for = self
            .payments
            .read()
            .await
            .get(payment_key)
            .cloned()
            .unwrap_or_else(|| merchant_uid.to_string());

        let prepared = self
            .prepared
            .read()
            .await
            .get(&paid_for)
            .copied()
            .ok_or_else(|| GatewayError::NotFound(paid_for.clone()))?;

        let outcome = self
            .outcomes
            .read()
            .await
            .get(&paid_for)
            .cloned()
            .unwrap_or(MockOutcome::Approve);

        let amount = match outcome {
            MockOutcome::Approve => prepared,
            MockOutcome::PaidAmount(amount) => amount,
            MockOutcome::Decline(reason) => return Err(GatewayError::Declined(reason)),
        };

        self.payments
            .write()
            .await
            .entry(payment_key.to_string())
            .or_insert_with(|| paid_for.clone());

        Ok(GatewayPayment {
            payment_key: payment_key.to_string(),
            merchant_uid: paid_for,
            amount,
        })
    }

    async fn cancel(&self, payment_key: &str, reason: &str) -> GatewayResult<()> {
        tracing::info!(payment_key, reason, "mock gateway cancel");
        self.cancelled.write().await.push(payment_key.to_string());
        Ok(())
    }
}
