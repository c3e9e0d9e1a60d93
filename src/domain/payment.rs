use super::phone::PhoneNumber;
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback shown when the gateway reports a failure without a message.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Payment failed";

/// A positive amount in Rwandan francs. RWF has no minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self, PaymentError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation(
                "Amount must be a positive number of RWF".to_string(),
            ))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Amount {
    type Error = PaymentError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} RWF", self.0)
    }
}

/// What the user submitted. Immutable once sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub phone_number: PhoneNumber,
    pub amount: Amount,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Successful,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Successful => "successful",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A payment attempt known to the gateway.
///
/// Created in `Pending` once initiation succeeds. Only the poller moves it
/// out of `Pending`, after which it never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub request_transaction_id: String,
    pub gateway_transaction_id: String,
    pub status: TransactionStatus,
    pub response_code: String,
}

impl PaymentTransaction {
    pub fn pending(request_transaction_id: String, gateway_transaction_id: String) -> Self {
        Self {
            request_transaction_id,
            gateway_transaction_id,
            status: TransactionStatus::Pending,
            response_code: String::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != TransactionStatus::Pending
    }

    /// Moves a pending transaction to its final status. Settled transactions
    /// are left untouched.
    pub fn settle(&mut self, status: TransactionStatus, response_code: Option<&str>) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        if let Some(code) = response_code {
            self.response_code = code.to_string();
        }
    }

    pub fn query(&self) -> StatusQuery {
        StatusQuery {
            request_transaction_id: self.request_transaction_id.clone(),
            intouchpay_transaction_id: self.gateway_transaction_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
}

/// Payload handed to the completion callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletion {
    pub transaction_id: String,
    pub intouchpay_transaction_id: String,
    pub amount: Amount,
    pub description: String,
    pub status: CompletionStatus,
    pub phone_number: PhoneNumber,
}

impl PaymentCompletion {
    pub fn new(request: &PaymentRequest, transaction: &PaymentTransaction) -> Self {
        Self {
            transaction_id: transaction.request_transaction_id.clone(),
            intouchpay_transaction_id: transaction.gateway_transaction_id.clone(),
            amount: request.amount,
            description: request.description.clone(),
            status: CompletionStatus::Completed,
            phone_number: request.phone_number.clone(),
        }
    }
}

/// Body of `POST /api/payments/request`'s response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitiationResponse {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub intouchpay_transaction_id: Option<String>,
    pub message: Option<String>,
}

/// Body of `POST /api/payments/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub request_transaction_id: String,
    pub intouchpay_transaction_id: String,
}

/// Body of `POST /api/payments/status`'s response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusResponse {
    pub success: bool,
    pub status: Option<String>,
    pub message: Option<String>,
    pub response_code: Option<String>,
}

impl StatusResponse {
    pub fn pending() -> Self {
        Self {
            success: true,
            status: Some("pending".to_string()),
            message: Some("Transaction pending".to_string()),
            response_code: Some("1000".to_string()),
        }
    }

    pub fn successful() -> Self {
        Self {
            success: true,
            status: Some("successful".to_string()),
            message: Some("Transaction successful".to_string()),
            response_code: Some("01".to_string()),
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            success: false,
            status: Some("failed".to_string()),
            message: Some(message.to_string()),
            response_code: None,
        }
    }
}

/// How one status response is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Succeeded,
    Failed(String),
    Pending,
}

/// Gateway response codes with a fixed meaning.
///
/// A recognised code decides the outcome; the status string is consulted only
/// when the code is absent or unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCodes {
    pub success: Vec<String>,
    pub failure: Vec<String>,
    pub pending: Vec<String>,
}

impl Default for ResponseCodes {
    fn default() -> Self {
        Self {
            success: vec!["01".to_string()],
            failure: Vec::new(),
            pending: vec!["1000".to_string()],
        }
    }
}

impl ResponseCodes {
    pub fn classify(&self, response: &StatusResponse) -> StatusOutcome {
        let failure = || {
            StatusOutcome::Failed(
                response
                    .message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                    .to_string(),
            )
        };

        if let Some(code) = response.response_code.as_deref().map(str::trim) {
            if self.success.iter().any(|c| c == code) {
                return StatusOutcome::Succeeded;
            }
            if self.failure.iter().any(|c| c == code) {
                return failure();
            }
            if self.pending.iter().any(|c| c == code) {
                return StatusOutcome::Pending;
            }
        }

        match response
            .status
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("successful") | Some("success") => StatusOutcome::Succeeded,
            Some("failed") | Some("error") => failure(),
            _ => StatusOutcome::Pending,
        }
    }
}
