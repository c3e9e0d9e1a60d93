use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

/// One purchase to run through the checkout.
///
/// The phone number is kept as typed; validation happens in the checkout so
/// a bad number shows up as an outcome row rather than a read error.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentRow {
    pub phone: String,
    pub amount: u64,
    #[serde(default)]
    pub description: String,
}

/// Reads payment rows from a CSV source with a `phone,amount,description`
/// header.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths.
pub struct PaymentRequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentRequestReader<R> {
    /// Creates a new reader from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes rows.
    pub fn rows(self) -> impl Iterator<Item = Result<PaymentRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
