//! Adapters behind the domain ports.

pub mod http;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
