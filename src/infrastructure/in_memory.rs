use crate::domain::payment::{
    InitiationResponse, PaymentRequest, PaymentTransaction, StatusQuery, StatusResponse,
};
use crate::domain::ports::{PaymentGateway, TransactionStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory journal of payment transactions.
///
/// Uses `Arc<RwLock<HashMap<String, PaymentTransaction>>>` so clones share state.
/// Used when no persistent journal is configured.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, PaymentTransaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn store(&self, tx: PaymentTransaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(tx.request_transaction_id.clone(), tx);
        Ok(())
    }

    async fn get(&self, request_transaction_id: &str) -> Result<Option<PaymentTransaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(request_transaction_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<PaymentTransaction>> {
        let transactions = self.transactions.read().await;
        let mut all: Vec<_> = transactions.values().cloned().collect();
        all.sort_by(|a, b| a.request_transaction_id.cmp(&b.request_transaction_id));
        Ok(all)
    }
}

/// One scripted reply to a status check.
#[derive(Debug, Clone)]
pub enum StatusStep {
    Respond(StatusResponse),
    NetworkError(String),
}

/// A gateway that replays programmed responses, counts every call and
/// remembers the token each call carried.
///
/// Status steps are consumed in order; once the queue is empty the fallback
/// step answers every further check.
pub struct ScriptedGateway {
    initiation: std::result::Result<InitiationResponse, String>,
    steps: Mutex<VecDeque<StatusStep>>,
    fallback: StatusStep,
    issued: AtomicUsize,
    request_calls: AtomicUsize,
    status_calls: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::always_pending()
    }
}

impl ScriptedGateway {
    /// Accepts every payment and answers `pending` forever.
    pub fn always_pending() -> Self {
        Self {
            initiation: Ok(InitiationResponse {
                success: true,
                ..InitiationResponse::default()
            }),
            steps: Mutex::new(VecDeque::new()),
            fallback: StatusStep::Respond(StatusResponse::pending()),
            issued: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        }
    }

    /// Reports `successful` on the given status check (1-based).
    pub fn approving_on(attempt: usize) -> Self {
        let steps = Self::pending_steps(attempt)
            .chain([StatusStep::Respond(StatusResponse::successful())])
            .collect();
        Self::always_pending().with_steps(steps)
    }

    /// Reports `failed` with `message` on the given status check (1-based).
    pub fn declining_on(attempt: usize, message: &str) -> Self {
        let steps = Self::pending_steps(attempt)
            .chain([StatusStep::Respond(StatusResponse::failed(message))])
            .collect();
        Self::always_pending().with_steps(steps)
    }

    fn pending_steps(attempt: usize) -> impl Iterator<Item = StatusStep> {
        std::iter::repeat_n(
            StatusStep::Respond(StatusResponse::pending()),
            attempt.saturating_sub(1),
        )
    }

    pub fn with_steps(mut self, steps: Vec<StatusStep>) -> Self {
        self.steps = Mutex::new(steps.into());
        self
    }

    pub fn with_fallback(mut self, fallback: StatusStep) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_initiation(mut self, response: InitiationResponse) -> Self {
        self.initiation = Ok(response);
        self
    }

    /// Makes initiation fail as if the network were down.
    pub fn with_unreachable_initiation(mut self, message: &str) -> Self {
        self.initiation = Err(message.to_string());
        self
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Tokens seen so far, one entry per call in call order.
    pub async fn tokens_seen(&self) -> Vec<Option<String>> {
        self.tokens.lock().await.clone()
    }

    async fn note_token(&self, token: Option<&str>) {
        self.tokens.lock().await.push(token.map(str::to_string));
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn request_payment(&self, _request: &PaymentRequest, token: Option<&str>) -> Result<InitiationResponse> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        self.note_token(token).await;
        let mut response = self
            .initiation
            .clone()
            .map_err(|msg| PaymentError::Io(std::io::Error::other(msg)))?;

        if response.success {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            response
                .transaction_id
                .get_or_insert_with(|| format!("REQ-{n:06}"));
            response
                .intouchpay_transaction_id
                .get_or_insert_with(|| format!("ITP-{n:06}"));
        }
        Ok(response)
    }

    async fn check_status(&self, _query: &StatusQuery, token: Option<&str>) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.note_token(token).await;
        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            StatusStep::Respond(response) => Ok(response),
            StatusStep::NetworkError(msg) => Err(PaymentError::Io(std::io::Error::other(msg))),
        }
    }
}
