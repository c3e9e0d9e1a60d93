//! Batch checkout over CSV files.

pub mod outcome_writer;
pub mod request_reader;
