use crate::application::modal::{ModalState, ModalStep};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

const HEADER: [&str; 6] = [
    "phone",
    "amount",
    "transaction_id",
    "gateway_transaction_id",
    "status",
    "message",
];

/// The result of one batch checkout.
///
/// `amount` is empty for input rows that could not be read at all.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OutcomeRow {
    pub phone: String,
    pub amount: Option<u64>,
    pub transaction_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub status: String,
    pub message: Option<String>,
}

impl OutcomeRow {
    pub fn from_state(amount: u64, state: &ModalState) -> Self {
        let status = match state.step {
            ModalStep::Success => "completed",
            ModalStep::Error => "failed",
            _ => "incomplete",
        };
        Self {
            phone: state.phone_number.clone(),
            amount: Some(amount),
            transaction_id: state.transaction_id.clone(),
            gateway_transaction_id: state.gateway_transaction_id.clone(),
            status: status.to_string(),
            message: state.error_message.clone(),
        }
    }

    /// A row that never reached the checkout, e.g. a zero amount or a
    /// record that failed to parse.
    pub fn rejected(phone: &str, amount: Option<u64>, message: String) -> Self {
        Self {
            phone: phone.to_string(),
            amount,
            transaction_id: None,
            gateway_transaction_id: None,
            status: "failed".to_string(),
            message: Some(message),
        }
    }
}

/// Writes outcome rows as CSV. The header goes out up front, so an empty
/// batch still produces one.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, row: &OutcomeRow) -> Result<()> {
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
