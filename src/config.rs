use crate::application::poller::PollPolicy;
use crate::domain::payment::ResponseCodes;
use crate::error::{PaymentError, Result};
use crate::infrastructure::http::DEFAULT_TIMEOUT;
use std::time::Duration;

/// Everything the checkout needs besides the gateway itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub request_timeout: Duration,
    pub policy: PollPolicy,
    pub codes: ResponseCodes,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            policy: PollPolicy::default(),
            codes: ResponseCodes::default(),
        }
    }
}

impl CheckoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.policy.interval.is_zero() {
            return Err(PaymentError::Config("poll interval must be non-zero".to_string()));
        }
        if self.policy.max_attempts == 0 {
            return Err(PaymentError::Config("max attempts must be at least 1".to_string()));
        }
        if self.codes.success.is_empty() {
            return Err(PaymentError::Config(
                "at least one success response code is required".to_string(),
            ));
        }
        if let Some(code) = self
            .codes
            .success
            .iter()
            .find(|c| self.codes.failure.contains(c) || self.codes.pending.contains(c))
        {
            return Err(PaymentError::Config(format!(
                "response code '{code}' is configured with two meanings"
            )));
        }
        Ok(())
    }
}
