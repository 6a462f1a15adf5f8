use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount_cents: i64,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn charge(&self, quote_id: Uuid, amount_cents: i64) -> AppResult<PaymentReceipt>;
}

/// Accepts every positive charge. Stands in until a processor is integrated.
#[derive(Debug, Default, Clone)]
pub struct StubPaymentProcessor;

#[async_trait]
impl PaymentProcessor for StubPaymentProcessor {
    #[instrument(skip(self))]
    async fn charge(&self, quote_id: Uuid, amount_cents: i64) -> AppResult<PaymentReceipt> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidInput(
                "Amount must be greater than zero".into(),
            ));
        }
        let reference = format!("stub_pay_{}", Uuid::new_v4().simple());
        info!(reference = %reference, "stub payment succeeded");
        Ok(PaymentReceipt {
            reference,
            amount_cents,
        })
    }
}

/// Always declines.
#[derive(Debug, Default, Clone)]
pub struct DecliningPaymentProcessor;

#[async_trait]
impl PaymentProcessor for DecliningPaymentProcessor {
    async fn charge(&self, _quote_id: Uuid, _amount_cents: i64) -> AppResult<PaymentReceipt> {
        Err(AppError::InvalidInput("Payment was declined".into()))
    }
}
