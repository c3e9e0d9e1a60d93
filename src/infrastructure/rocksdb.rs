use crate::domain::payment::PaymentTransaction;
use crate::domain::ports::TransactionStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for the payment transaction journal.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent transaction journal backed by RocksDB.
///
/// Keys are request transaction ids, values the JSON-encoded transaction.
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the
    /// "transactions" column family if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn transactions_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_TRANSACTIONS).ok_or_else(|| {
            PaymentError::Io(std::io::Error::other("Transactions column family not found"))
        })
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn store(&self, tx: PaymentTransaction) -> Result<()> {
        let cf = self.transactions_cf()?;
        let value = serde_json::to_vec(&tx)?;
        self.db.put_cf(cf, tx.request_transaction_id.as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, request_transaction_id: &str) -> Result<Option<PaymentTransaction>> {
        let cf = self.transactions_cf()?;
        match self.db.get_cf(cf, request_transaction_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<PaymentTransaction>> {
        let cf = self.transactions_cf()?;
        let mut transactions = Vec::new();

        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            transactions.push(serde_json::from_slice(&value)?);
        }

        Ok(transactions)
    }
}
