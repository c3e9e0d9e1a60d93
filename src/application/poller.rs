use crate::domain::payment::{PaymentTransaction, ResponseCodes, StatusOutcome, TransactionStatus};
use crate::domain::ports::SharedGateway;
use crate::error::PaymentError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// How a polling run ended. Every variant carries the transaction as last seen.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(PaymentTransaction),
    Failed {
        transaction: PaymentTransaction,
        message: String,
    },
    TimedOut {
        transaction: PaymentTransaction,
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn transaction(&self) -> &PaymentTransaction {
        match self {
            PollOutcome::Succeeded(transaction)
            | PollOutcome::Failed { transaction, .. }
            | PollOutcome::TimedOut { transaction, .. } => transaction,
        }
    }

    /// The user-facing error for a non-successful run.
    pub fn error(&self) -> Option<PaymentError> {
        match self {
            PollOutcome::Succeeded(_) => None,
            PollOutcome::Failed { message, .. } => Some(PaymentError::Polling(message.clone())),
            PollOutcome::TimedOut { attempts, .. } => Some(PaymentError::Timeout { attempts: *attempts }),
        }
    }
}

/// Queries the gateway at a fixed interval until the transaction settles or
/// the attempt budget runs out.
///
/// Network errors are logged and skipped but still use up an attempt, so the
/// budget bounds the total number of status calls.
#[derive(Clone)]
pub struct StatusPoller {
    gateway: SharedGateway,
    policy: PollPolicy,
    codes: ResponseCodes,
}

impl StatusPoller {
    pub fn new(gateway: SharedGateway, policy: PollPolicy, codes: ResponseCodes) -> Self {
        Self {
            gateway,
            policy,
            codes,
        }
    }

    /// Runs the polling loop to completion on the current task, sending
    /// `token` with every status check.
    ///
    /// The first status check happens one interval after the call.
    pub async fn poll(&self, mut transaction: PaymentTransaction, token: Option<&str>) -> PollOutcome {
        let query = transaction.query();
        let interval = self.policy.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=self.policy.max_attempts {
            ticker.tick().await;

            let response = match self.gateway.check_status(&query, token).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, "status check failed, will retry");
                    continue;
                }
            };

            match self.codes.classify(&response) {
                StatusOutcome::Succeeded => {
                    transaction.settle(TransactionStatus::Successful, response.response_code.as_deref());
                    info!(attempt, id = %transaction.request_transaction_id, "payment successful");
                    return PollOutcome::Succeeded(transaction);
                }
                StatusOutcome::Failed(message) => {
                    transaction.settle(TransactionStatus::Failed, response.response_code.as_deref());
                    info!(attempt, id = %transaction.request_transaction_id, %message, "payment failed");
                    return PollOutcome::Failed {
                        transaction,
                        message,
                    };
                }
                StatusOutcome::Pending => {
                    debug!(attempt, status = ?response.status, "payment still pending");
                }
            }
        }

        warn!(
            attempts = self.policy.max_attempts,
            id = %transaction.request_transaction_id,
            "payment status polling timed out"
        );
        PollOutcome::TimedOut {
            transaction,
            attempts: self.policy.max_attempts,
        }
    }

    /// Starts polling on a background task.
    pub fn spawn(&self, transaction: PaymentTransaction, token: Option<String>) -> PollHandle {
        let poller = self.clone();
        PollHandle {
            task: tokio::spawn(async move { poller.poll(transaction, token.as_deref()).await }),
        }
    }
}

/// Owning handle to a background polling task.
///
/// Dropping the handle aborts the task, so no status call is issued after
/// the owner lets go of it.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Waits for the task to finish. `None` if it was aborted or panicked.
    ///
    /// Cancel-safe, but must not be awaited again once it has returned.
    pub async fn join(&mut self) -> Option<PollOutcome> {
        (&mut self.task).await.ok()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
