use super::initiator::PaymentInitiator;
use super::poller::{PollHandle, PollOutcome, StatusPoller};
use crate::domain::payment::{Amount, PaymentCompletion, PaymentRequest, PaymentTransaction};
use crate::domain::phone::PhoneNumber;
use crate::domain::ports::SharedStore;
use crate::error::{PaymentError, Result};
use std::fmt;
use tracing::{info, warn};

const POLL_STOPPED_MESSAGE: &str = "Payment status checks stopped unexpectedly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalStep {
    #[default]
    Input,
    Processing,
    Success,
    Error,
    Closed,
}

impl fmt::Display for ModalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModalStep::Input => "input",
            ModalStep::Processing => "processing",
            ModalStep::Success => "success",
            ModalStep::Error => "error",
            ModalStep::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEvent {
    SubmitValid,
    SubmitInvalid,
    InitiationFailed,
    PollSucceeded,
    PollFailed,
    Retry,
    Close,
}

impl fmt::Display for ModalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModalEvent::SubmitValid | ModalEvent::SubmitInvalid => "submit",
            ModalEvent::InitiationFailed => "initiation failed",
            ModalEvent::PollSucceeded => "payment succeeded",
            ModalEvent::PollFailed => "payment failed",
            ModalEvent::Retry => "retry",
            ModalEvent::Close => "close",
        };
        f.write_str(name)
    }
}

impl ModalStep {
    /// The checkout transition table. Anything not listed is rejected and
    /// leaves the step unchanged.
    pub fn on(self, event: ModalEvent) -> Result<ModalStep> {
        use ModalEvent::*;
        use ModalStep::*;

        match (self, event) {
            (_, Close) => Ok(Closed),
            (Input, SubmitValid) => Ok(Processing),
            (Input, SubmitInvalid) => Ok(Error),
            (Processing, InitiationFailed) => Ok(Error),
            (Processing, PollSucceeded) => Ok(Success),
            (Processing, PollFailed) => Ok(Error),
            (Error, Retry) => Ok(Input),
            (step, event) => Err(PaymentError::InvalidTransition {
                step: step.to_string(),
                event: event.to_string(),
            }),
        }
    }
}

/// What the checkout modal shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    pub step: ModalStep,
    pub phone_number: String,
    pub transaction_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub error_message: Option<String>,
}

pub type CompletionCallback = Box<dyn Fn(&PaymentCompletion) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// One checkout for a fixed amount and description.
///
/// Owns at most one [`PollHandle`]. Starting a payment, reaching a terminal
/// step, closing and dropping the modal all release it.
pub struct PaymentModal {
    initiator: PaymentInitiator,
    poller: StatusPoller,
    amount: Amount,
    description: String,
    token: Option<String>,
    journal: Option<SharedStore>,
    on_complete: Option<CompletionCallback>,
    on_error: Option<ErrorCallback>,
    state: ModalState,
    request: Option<PaymentRequest>,
    transaction: Option<PaymentTransaction>,
    error: Option<PaymentError>,
    poll: Option<PollHandle>,
}

impl PaymentModal {
    pub fn new(
        initiator: PaymentInitiator,
        poller: StatusPoller,
        amount: Amount,
        description: impl Into<String>,
    ) -> Self {
        Self {
            initiator,
            poller,
            amount,
            description: description.into(),
            token: None,
            journal: None,
            on_complete: None,
            on_error: None,
            state: ModalState::default(),
            request: None,
            transaction: None,
            error: None,
            poll: None,
        }
    }

    /// Credential sent with every gateway call this modal makes.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_journal(mut self, journal: SharedStore) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn on_complete(mut self, callback: impl Fn(&PaymentCompletion) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn transaction(&self) -> Option<&PaymentTransaction> {
        self.transaction.as_ref()
    }

    /// Takes the error behind the current `error` step, if any.
    pub fn take_error(&mut self) -> Option<PaymentError> {
        self.error.take()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// Handles the "Pay" action with the number the user typed.
    ///
    /// An invalid number moves straight to `error` without touching the
    /// gateway. Otherwise the modal enters `processing`, initiates the payment
    /// and, if the gateway accepts it, starts polling in the background.
    pub async fn submit(&mut self, raw_phone: &str) -> Result<&ModalState> {
        // Valid and invalid submissions share the same precondition.
        self.state.step.on(ModalEvent::SubmitValid)?;
        self.poll = None;
        self.state.phone_number = raw_phone.to_string();

        let phone_number = match PhoneNumber::parse(raw_phone) {
            Ok(phone) => phone,
            Err(e) => {
                self.apply(ModalEvent::SubmitInvalid)?;
                self.set_error(e);
                return Ok(&self.state);
            }
        };
        self.apply(ModalEvent::SubmitValid)?;

        let request = PaymentRequest {
            phone_number,
            amount: self.amount,
            description: self.description.clone(),
        };

        let transaction = match self.initiator.initiate(&request, self.token.as_deref()).await {
            Ok(transaction) => transaction,
            Err(e) => {
                self.apply(ModalEvent::InitiationFailed)?;
                self.set_error(e);
                return Ok(&self.state);
            }
        };

        self.state.transaction_id = Some(transaction.request_transaction_id.clone());
        self.state.gateway_transaction_id = Some(transaction.gateway_transaction_id.clone());
        self.record(&transaction).await;
        self.poll = Some(self.poller.spawn(transaction.clone(), self.token.clone()));
        self.transaction = Some(transaction);
        self.request = Some(request);

        Ok(&self.state)
    }

    /// Waits for the background poll to settle and applies its result.
    ///
    /// Cancel-safe: if this future is dropped the poll keeps running and
    /// stays owned by the modal until [`close`](Self::close).
    pub async fn wait_for_outcome(&mut self) -> Result<&ModalState> {
        let Some(handle) = self.poll.as_mut() else {
            return Err(PaymentError::InvalidTransition {
                step: self.state.step.to_string(),
                event: "await payment outcome".to_string(),
            });
        };
        let outcome = handle.join().await;
        self.poll = None;

        let Some(outcome) = outcome else {
            self.apply(ModalEvent::PollFailed)?;
            self.fail(PaymentError::Polling(POLL_STOPPED_MESSAGE.to_string()));
            return Ok(&self.state);
        };

        self.record(outcome.transaction()).await;
        self.transaction = Some(outcome.transaction().clone());

        match outcome.error() {
            None => {
                self.apply(ModalEvent::PollSucceeded)?;
                if let (Some(request), PollOutcome::Succeeded(transaction)) = (&self.request, &outcome) {
                    let completion = PaymentCompletion::new(request, transaction);
                    info!(id = %completion.transaction_id, "checkout completed");
                    if let Some(callback) = &self.on_complete {
                        callback(&completion);
                    }
                }
            }
            Some(e) => {
                self.apply(ModalEvent::PollFailed)?;
                self.fail(e);
            }
        }

        Ok(&self.state)
    }

    /// Submits and, if polling started, waits for the result.
    pub async fn run(&mut self, raw_phone: &str) -> Result<&ModalState> {
        self.submit(raw_phone).await?;
        if self.poll.is_some() {
            self.wait_for_outcome().await?;
        }
        Ok(&self.state)
    }

    /// "Try Again": back to `input` with the error cleared.
    pub fn retry(&mut self) -> Result<&ModalState> {
        self.apply(ModalEvent::Retry)?;
        self.state.error_message = None;
        self.error = None;
        self.state.transaction_id = None;
        self.state.gateway_transaction_id = None;
        self.request = None;
        self.transaction = None;
        Ok(&self.state)
    }

    /// Stops any running poll and resets the modal. No state change or
    /// callback happens after this returns.
    pub fn close(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.cancel();
        }
        self.request = None;
        self.transaction = None;
        self.error = None;
        self.state = ModalState {
            step: ModalStep::Closed,
            ..ModalState::default()
        };
    }

    fn apply(&mut self, event: ModalEvent) -> Result<()> {
        self.state.step = self.state.step.on(event)?;
        Ok(())
    }

    fn set_error(&mut self, error: PaymentError) {
        self.state.error_message = Some(error.to_string());
        self.error = Some(error);
    }

    fn fail(&mut self, error: PaymentError) {
        let message = error.to_string();
        warn!(%message, "checkout failed");
        if let Some(callback) = &self.on_error {
            callback(&message);
        }
        self.set_error(error);
    }

    async fn record(&self, transaction: &PaymentTransaction) {
        if let Some(journal) = &self.journal
            && let Err(e) = journal.store(transaction.clone()).await
        {
            warn!(error = %e, id = %transaction.request_transaction_id, "failed to journal transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::poller::PollPolicy;
    use crate::domain::payment::{InitiationResponse, ResponseCodes, TransactionStatus};
    use crate::domain::ports::TransactionStore;
    use crate::infrastructure::in_memory::{InMemoryTransactionStore, ScriptedGateway};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default, Clone)]
    struct Recorder {
        completions: Arc<Mutex<Vec<PaymentCompletion>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    fn modal(gateway: Arc<ScriptedGateway>, recorder: &Recorder) -> PaymentModal {
        let completions = recorder.completions.clone();
        let errors = recorder.errors.clone();
        PaymentModal::new(
            PaymentInitiator::new(gateway.clone()),
            StatusPoller::new(gateway, PollPolicy::default(), ResponseCodes::default()),
            Amount::new(6000).unwrap(),
            "2 x Regular - APR FC vs Rayon Sports",
        )
        .on_complete(move |c| completions.lock().unwrap().push(c.clone()))
        .on_error(move |e| errors.lock().unwrap().push(e.to_string()))
    }

    #[test]
    fn test_transition_table() {
        use ModalEvent::*;
        use ModalStep::*;

        assert_eq!(Input.on(SubmitValid).unwrap(), Processing);
        assert_eq!(Input.on(SubmitInvalid).unwrap(), Error);
        assert_eq!(Processing.on(InitiationFailed).unwrap(), Error);
        assert_eq!(Processing.on(PollSucceeded).unwrap(), Success);
        assert_eq!(Processing.on(PollFailed).unwrap(), Error);
        assert_eq!(Error.on(Retry).unwrap(), Input);
        for step in [Input, Processing, Success, Error, Closed] {
            assert_eq!(step.on(Close).unwrap(), Closed);
        }

        assert!(Success.on(Retry).is_err());
        assert!(Processing.on(SubmitValid).is_err());
        assert!(Closed.on(SubmitValid).is_err());
        assert!(Input.on(PollSucceeded).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_fires_completion() {
        let gateway = Arc::new(ScriptedGateway::approving_on(1));
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        let state = modal.submit("250788123456").await.unwrap();
        assert_eq!(state.step, ModalStep::Processing);
        assert_eq!(state.transaction_id.as_deref(), Some("REQ-000001"));
        assert!(modal.is_polling());

        let state = modal.wait_for_outcome().await.unwrap();
        assert_eq!(state.step, ModalStep::Success);
        assert!(!modal.is_polling());

        let completions = recorder.completions.lock().unwrap();
        assert_eq!(completions.len(), 1);
        let json = serde_json::to_value(&completions[0]).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["amount"], 6000);
        assert_eq!(json["phoneNumber"], "250788123456");
        assert_eq!(json["intouchpayTransactionId"], "ITP-000001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_third_attempt_stops_polling() {
        let gateway = Arc::new(ScriptedGateway::approving_on(3));
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        let state = modal.run("250788123456").await.unwrap();
        assert_eq!(state.step, ModalStep::Success);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(gateway.status_calls(), 3);
        assert_eq!(recorder.completions.lock().unwrap().len(), 1);
        assert!(recorder.errors.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_pending_times_out() {
        let gateway = Arc::new(ScriptedGateway::always_pending());
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        let state = modal.run("250788123456").await.unwrap().clone();

        assert_eq!(state.step, ModalStep::Error);
        assert!(state.error_message.unwrap().contains("timed out"));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(gateway.status_calls(), 60);
        assert_eq!(recorder.errors.lock().unwrap().len(), 1);
        assert!(recorder.completions.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_mid_poll_stops_status_calls() {
        let gateway = Arc::new(ScriptedGateway::always_pending());
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        modal.submit("250788123456").await.unwrap();
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(gateway.status_calls(), 1);

        modal.close();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(gateway.status_calls(), 1);
        assert_eq!(modal.state().step, ModalStep::Closed);
        assert!(modal.state().transaction_id.is_none());
        assert!(!modal.is_polling());
        assert!(recorder.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_phone_never_reaches_gateway() {
        let gateway = Arc::new(ScriptedGateway::approving_on(1));
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        let state = modal.submit("123456").await.unwrap();

        assert_eq!(state.step, ModalStep::Error);
        assert!(state.error_message.as_deref().unwrap().contains("valid Rwandan"));
        assert_eq!(gateway.request_calls(), 0);
        assert!(matches!(modal.take_error(), Some(PaymentError::Validation(_))));
        assert!(!modal.is_polling());
    }

    #[tokio::test]
    async fn test_initiation_failure_shows_gateway_message() {
        let gateway = Arc::new(ScriptedGateway::approving_on(1).with_initiation(InitiationResponse {
            success: false,
            message: Some("Amount exceeds wallet limit".to_string()),
            ..InitiationResponse::default()
        }));
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        let state = modal.submit("250788123456").await.unwrap();

        assert_eq!(state.step, ModalStep::Error);
        assert_eq!(state.error_message.as_deref(), Some("Amount exceeds wallet limit"));
        assert_eq!(gateway.status_calls(), 0);
        assert!(matches!(modal.take_error(), Some(PaymentError::Initiation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_decline_then_succeed() {
        let gateway = Arc::new(ScriptedGateway::declining_on(1, "Declined"));
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder);

        let state = modal.run("250788123456").await.unwrap();
        assert_eq!(state.step, ModalStep::Error);
        assert_eq!(state.error_message.as_deref(), Some("Declined"));
        assert_eq!(recorder.errors.lock().unwrap().as_slice(), ["Declined"]);

        let state = modal.retry().unwrap();
        assert_eq!(state.step, ModalStep::Input);
        assert!(state.error_message.is_none());

        // The script is exhausted, so the second attempt stays pending.
        modal.submit("250788123456").await.unwrap();
        assert_eq!(modal.state().transaction_id.as_deref(), Some("REQ-000002"));
        modal.close();
    }

    #[tokio::test]
    async fn test_invalid_actions_are_rejected() {
        let gateway = Arc::new(ScriptedGateway::approving_on(1));
        let recorder = Recorder::default();
        let mut modal = modal(gateway, &recorder);

        assert!(matches!(modal.retry(), Err(PaymentError::InvalidTransition { .. })));
        assert!(modal.wait_for_outcome().await.is_err());
        assert_eq!(modal.state().step, ModalStep::Input);

        modal.close();
        assert!(modal.submit("250788123456").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_reaches_initiation_and_polling() {
        let gateway = Arc::new(ScriptedGateway::approving_on(2));
        let recorder = Recorder::default();
        let mut modal = modal(gateway.clone(), &recorder).with_token(Some("abc123".to_string()));

        modal.run("250788123456").await.unwrap();

        // One initiation plus two status checks.
        assert_eq!(gateway.tokens_seen().await, vec![Some("abc123".to_string()); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_journal_records_settled_transaction() {
        let gateway = Arc::new(ScriptedGateway::approving_on(2));
        let journal = Arc::new(InMemoryTransactionStore::new());
        let recorder = Recorder::default();
        let mut modal = modal(gateway, &recorder).with_journal(journal.clone());

        modal.run("+250 788 123 456").await.unwrap();

        let recorded = journal.get("REQ-000001").await.unwrap().unwrap();
        assert_eq!(recorded.status, TransactionStatus::Successful);
        assert_eq!(modal.transaction().unwrap(), &recorded);
    }
}
