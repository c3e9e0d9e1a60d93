use super::initiator::PaymentInitiator;
use super::modal::{ModalStep, PaymentModal};
use super::poller::StatusPoller;
use crate::config::CheckoutConfig;
use crate::domain::access::{BATCH_PURCHASE, PURCHASE, RequestContext};
use crate::domain::payment::{Amount, PaymentCompletion};
use crate::domain::ports::{SharedGateway, SharedStore};
use crate::error::{PaymentError, Result};
use crate::interfaces::csv::outcome_writer::{OutcomeRow, OutcomeWriter};
use crate::interfaces::csv::request_reader::PaymentRequestReader;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const INCOMPLETE_MESSAGE: &str = "Payment did not complete";

/// Totals for a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Opens checkout modals that share one gateway, poll policy and journal.
#[derive(Clone)]
pub struct Checkout {
    initiator: PaymentInitiator,
    poller: StatusPoller,
    journal: Option<SharedStore>,
}

impl Checkout {
    pub fn new(gateway: SharedGateway, config: &CheckoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            initiator: PaymentInitiator::new(gateway.clone()),
            poller: StatusPoller::new(gateway, config.policy, config.codes.clone()),
            journal: None,
        })
    }

    pub fn with_journal(mut self, journal: SharedStore) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Opens a modal whose gateway calls carry `ctx`'s token.
    pub fn open(&self, ctx: &RequestContext, amount: Amount, description: impl Into<String>) -> PaymentModal {
        let modal = PaymentModal::new(self.initiator.clone(), self.poller.clone(), amount, description)
            .with_token(ctx.token().map(str::to_string));
        match &self.journal {
            Some(journal) => modal.with_journal(journal.clone()),
            None => modal,
        }
    }

    /// Runs a single checkout to its end and returns the completion payload.
    pub async fn pay(
        &self,
        ctx: &RequestContext,
        raw_phone: &str,
        amount: Amount,
        description: &str,
    ) -> Result<PaymentCompletion> {
        PURCHASE.require(ctx)?;

        let completion = Arc::new(Mutex::new(None));
        let sink = completion.clone();
        let mut modal = self.open(ctx, amount, description).on_complete(move |c| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(c.clone());
            }
        });

        let step = modal.run(raw_phone).await?.step;
        let completed = completion.lock().ok().and_then(|mut slot| slot.take());
        match (step, completed) {
            (ModalStep::Success, Some(completion)) => Ok(completion),
            _ => Err(modal
                .take_error()
                .unwrap_or_else(|| PaymentError::Polling(INCOMPLETE_MESSAGE.to_string()))),
        }
    }

    /// Runs every row of `source` through its own checkout, one after the
    /// other, writing an outcome row for each.
    pub async fn run_batch<R: Read, W: Write>(
        &self,
        ctx: &RequestContext,
        source: R,
        sink: W,
    ) -> Result<BatchSummary> {
        BATCH_PURCHASE.require(ctx)?;

        let mut writer = OutcomeWriter::new(sink)?;
        let mut summary = BatchSummary::default();

        for row in PaymentRequestReader::new(source).rows() {
            let outcome = match row {
                Err(e) => {
                    warn!(error = %e, "unreadable payment row");
                    OutcomeRow::rejected("", None, e.to_string())
                }
                Ok(row) => match Amount::new(row.amount) {
                    Ok(amount) => {
                        let mut modal = self.open(ctx, amount, row.description.clone());
                        let state = modal.run(&row.phone).await?;
                        OutcomeRow::from_state(row.amount, state)
                    }
                    Err(e) => OutcomeRow::rejected(&row.phone, Some(row.amount), e.to_string()),
                },
            };

            if outcome.status == "completed" {
                summary.completed += 1;
            } else {
                summary.failed += 1;
            }
            writer.write(&outcome)?;
        }

        writer.flush()?;
        info!(completed = summary.completed, failed = summary.failed, "batch finished");
        Ok(summary)
    }
}
