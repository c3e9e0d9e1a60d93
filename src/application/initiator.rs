use crate::domain::payment::{PaymentRequest, PaymentTransaction};
use crate::domain::ports::SharedGateway;
use crate::error::{PaymentError, Result};
use tracing::{info, warn};

const DEFAULT_REJECTION: &str = "Payment request was rejected by the gateway";

/// Submits payment requests to the gateway.
///
/// Exactly one call per request; initiation is never retried automatically.
#[derive(Clone)]
pub struct PaymentInitiator {
    gateway: SharedGateway,
}

impl PaymentInitiator {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Sends the request on behalf of the holder of `token` and returns the
    /// pending transaction the gateway opened for it.
    pub async fn initiate(&self, request: &PaymentRequest, token: Option<&str>) -> Result<PaymentTransaction> {
        info!(
            phone = %request.phone_number,
            amount = request.amount.value(),
            "submitting payment request"
        );

        let response = self.gateway.request_payment(request, token).await.map_err(|e| {
            warn!(error = %e, "payment request failed");
            PaymentError::Initiation(format!("Could not reach the payment service: {e}"))
        })?;

        let rejection = || {
            let message = response
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
            warn!(%message, "payment request rejected");
            PaymentError::Initiation(message)
        };

        if !response.success {
            return Err(rejection());
        }

        match (
            response.transaction_id.clone(),
            response.intouchpay_transaction_id.clone(),
        ) {
            (Some(request_id), Some(gateway_id)) if !request_id.is_empty() && !gateway_id.is_empty() => {
                info!(%request_id, %gateway_id, "payment request accepted");
                Ok(PaymentTransaction::pending(request_id, gateway_id))
            }
            _ => Err(rejection()),
        }
    }
}
