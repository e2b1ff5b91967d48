use super::check_version;
use crate::domain::ports::{SettlementGateway, TransactionStore};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Column Family for ledger records, keyed by transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for the parent index: `parent_id/child_id` -> empty.
pub const CF_CANCELLATIONS: &str = "cancellations";
/// Column Family holding every message handed to the settlement stand-in.
pub const CF_SETTLEMENT_OUTBOX: &str = "settlement_outbox";

/// A persistent store implementation using RocksDB.
///
/// Records are stored as JSON. Writes are serialized through a mutex so the
/// version check and the `WriteBatch` commit cannot interleave.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_TRANSACTIONS, CF_CANCELLATIONS, CF_SETTLEMENT_OUTBOX]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::internal(format!("{name} column family not found")))
    }

    fn read(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        match self.db.get_cf(cf, id.as_str())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Messages handed to the settlement stand-in.
    pub fn outbox(&self) -> Result<Vec<String>> {
        let cf = self.cf(CF_SETTLEMENT_OUTBOX)?;
        let mut messages = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            messages.push(String::from_utf8_lossy(&value).into_owned());
        }
        Ok(messages)
    }
}

fn index_key(parent: &TransactionId, child: &TransactionId) -> String {
    format!("{parent}/{child}")
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn save(&self, tx: Transaction) -> Result<Transaction> {
        let mut saved = self.save_all(vec![tx]).await?;
        Ok(saved.remove(0))
    }

    async fn save_all(&self, txs: Vec<Transaction>) -> Result<Vec<Transaction>> {
        let _guard = self.write_lock.lock().await;

        for tx in &txs {
            let stored = self.read(tx.transaction_id())?.map(|t| t.version());
            check_version(stored, tx)?;
        }

        let transactions = self.cf(CF_TRANSACTIONS)?;
        let cancellations = self.cf(CF_CANCELLATIONS)?;
        let now = Utc::now();
        let mut batch = WriteBatch::default();
        let mut saved = Vec::with_capacity(txs.len());

        for mut tx in txs {
            if tx.version() == 0
                && let Some(parent) = tx.parent_transaction_id()
            {
                batch.put_cf(cancellations, index_key(parent, tx.transaction_id()), b"");
            }
            tx.mark_stored(now);
            batch.put_cf(transactions, tx.transaction_id().as_str(), serde_json::to_vec(&tx)?);
            saved.push(tx);
        }

        self.db.write(batch)?;
        Ok(saved)
    }

    async fn find_by_transaction_id(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        self.read(id)
    }

    async fn find_cancellations(&self, parent_id: &TransactionId) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_CANCELLATIONS)?;
        let prefix = format!("{parent_id}/");
        let mut children = Vec::new();

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            let Some(child) = key.strip_prefix(prefix.as_bytes()) else {
                break;
            };
            let child = TransactionId::parse(&String::from_utf8_lossy(child))?;
            if let Some(tx) = self.read(&child)? {
                children.push(tx);
            }
        }

        children.sort_by_key(|tx| tx.created_at());
        Ok(children)
    }
}

#[async_trait]
impl SettlementGateway for RocksDBStore {
    /// Always reports success; a failed outbox write is only logged.
    async fn send(&self, message: &str) -> Result<bool> {
        let written = self.cf(CF_SETTLEMENT_OUTBOX).and_then(|cf| {
            // Key by the message's transaction id slot.
            let key = message.get(14..34).unwrap_or(message).trim_end();
            self.db.put_cf(cf, key, message).map_err(PaymentError::from)
        });
        if let Err(e) = written {
            warn!(error = %e, "settlement outbox write failed");
        }
        Ok(true)
    }
}
