use thiserror::Error;

/// Every failure the checkout flow can surface.
///
/// The first four variants are the user-facing taxonomy: each one is terminal
/// for the current attempt and its message is shown verbatim in the modal.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Initiation(String),
    #[error("{0}")]
    Polling(String),
    #[error("Payment timed out after {attempts} status checks. Please check your phone and try again.")]
    Timeout { attempts: u32 },
    #[error("Gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gateway responded with HTTP {status}")]
    Http { status: u16 },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("Access denied: role '{role}' may not {action}")]
    Forbidden { role: String, action: String },
    #[error("Cannot handle '{event}' while the checkout is in '{step}'")]
    InvalidTransition { step: String, event: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
