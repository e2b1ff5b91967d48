use super::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for ledger records with optimistic concurrency.
///
/// A record with version 0 is an insert and its id must be unused. Any other
/// record must carry the version currently stored. Either mismatch is a
/// [`crate::error::PaymentError::ConflictError`]. Committed records come back
/// with their version incremented.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, tx: Transaction) -> Result<Transaction>;

    /// Saves every record or none of them.
    async fn save_all(&self, txs: Vec<Transaction>) -> Result<Vec<Transaction>>;

    async fn find_by_transaction_id(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// All CANCEL records whose parent is `parent_id`, oldest first.
    async fn find_cancellations(&self, parent_id: &TransactionId) -> Result<Vec<Transaction>>;
}

/// The counterpart that receives encoded outbound records.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Returns whether the counterpart accepted the message.
    async fn send(&self, message: &str) -> Result<bool>;
}

pub type TransactionStoreBox = Box<dyn TransactionStore>;
pub type SettlementGatewayBox = Box<dyn SettlementGateway>;
