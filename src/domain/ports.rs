use super::payment::{InitiationResponse, PaymentRequest, PaymentTransaction, StatusQuery, StatusResponse};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The mobile-money payments API, as seen from the checkout.
///
/// `token` is the caller's credential and is sent with that call only.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `POST /api/payments/request`
    async fn request_payment(&self, request: &PaymentRequest, token: Option<&str>) -> Result<InitiationResponse>;
    /// `POST /api/payments/status`
    async fn check_status(&self, query: &StatusQuery, token: Option<&str>) -> Result<StatusResponse>;
}

/// Journal of payment attempts keyed by request transaction id.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn store(&self, tx: PaymentTransaction) -> Result<()>;
    async fn get(&self, request_transaction_id: &str) -> Result<Option<PaymentTransaction>>;
    async fn get_all(&self) -> Result<Vec<PaymentTransaction>>;
}

/// The poller runs on its own task and batch flows share one journal.
pub type SharedGateway = Arc<dyn PaymentGateway>;
pub type SharedStore = Arc<dyn TransactionStore>;
