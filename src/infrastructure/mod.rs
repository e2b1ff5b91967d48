//! Adapters behind the domain ports.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};

/// Compare-and-swap check shared by every store: `stored` is the version
/// currently persisted for the incoming record's id, if any.
pub(crate) fn check_version(stored: Option<u64>, incoming: &Transaction) -> Result<()> {
    match (stored, incoming.version()) {
        (None, 0) => Ok(()),
        (Some(_), 0) => Err(PaymentError::ConflictError(format!(
            "transaction {} already exists",
            incoming.transaction_id()
        ))),
        (None, _) => Err(PaymentError::ConflictError(format!(
            "transaction {} was never stored",
            incoming.transaction_id()
        ))),
        (Some(current), supplied) if current == supplied => Ok(()),
        (Some(current), supplied) => Err(PaymentError::ConflictError(format!(
            "stale write for transaction {}: supplied version {supplied}, stored version {current}",
            incoming.transaction_id()
        ))),
    }
}
