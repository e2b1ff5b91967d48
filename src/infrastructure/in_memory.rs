use super::check_version;
use crate::domain::ports::{SettlementGateway, TransactionStore};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<TransactionId, Transaction>,
    /// parent id -> cancellation ids, in insertion order.
    cancellations: HashMap<TransactionId, Vec<TransactionId>>,
}

/// A thread-safe in-memory transaction store.
///
/// Uses `Arc<RwLock<..>>` so clones share one ledger. Version checks and
/// commits happen under a single write lock, which makes `save_all` atomic.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn save(&self, tx: Transaction) -> Result<Transaction> {
        let mut saved = self.save_all(vec![tx]).await?;
        Ok(saved.remove(0))
    }

    async fn save_all(&self, txs: Vec<Transaction>) -> Result<Vec<Transaction>> {
        let mut state = self.state.write().await;

        for tx in &txs {
            let stored = state
                .transactions
                .get(tx.transaction_id())
                .map(Transaction::version);
            check_version(stored, tx)?;
        }

        let now = Utc::now();
        let mut saved = Vec::with_capacity(txs.len());
        for mut tx in txs {
            if tx.version() == 0
                && let Some(parent) = tx.parent_transaction_id()
            {
                state
                    .cancellations
                    .entry(parent.clone())
                    .or_default()
                    .push(tx.transaction_id().clone());
            }
            tx.mark_stored(now);
            state
                .transactions
                .insert(tx.transaction_id().clone(), tx.clone());
            saved.push(tx);
        }
        Ok(saved)
    }

    async fn find_by_transaction_id(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state.transactions.get(id).cloned())
    }

    async fn find_cancellations(&self, parent_id: &TransactionId) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .cancellations
            .get(parent_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.transactions.get(id).cloned())
            .collect())
    }
}

/// Stand-in for the settlement counterpart: keeps every message in an
/// outbox and always accepts.
#[derive(Default, Clone)]
pub struct InMemorySettlementGateway {
    outbox: Arc<RwLock<Vec<String>>>,
}

impl InMemorySettlementGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first.
    pub async fn messages(&self) -> Vec<String> {
        self.outbox.read().await.clone()
    }
}

#[async_trait]
impl SettlementGateway for InMemorySettlementGateway {
    async fn send(&self, message: &str) -> Result<bool> {
        self.outbox.write().await.push(message.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card_cipher::CardInfo;
    use crate::error::PaymentError;

    fn new_pay(amount: u64) -> Transaction {
        let card = CardInfo::new("1234567890123456", "1225", "777").unwrap();
        Transaction::new_pay(card, 0, amount, None).unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_version() {
        let store = InMemoryTransactionStore::new();
        let tx = new_pay(1000);

        let saved = store.save(tx.clone()).await.unwrap();
        assert_eq!(saved.version(), 1);

        let retrieved = store
            .find_by_transaction_id(tx.transaction_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved, saved);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemoryTransactionStore::new();
        let tx = new_pay(1000);
        store.save(tx.clone()).await.unwrap();

        let result = store.save(tx).await;
        assert!(matches!(result, Err(PaymentError::ConflictError(_))));
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryTransactionStore::new();
        let saved = store.save(new_pay(1000)).await.unwrap();

        let mut first = saved.clone();
        let mut second = saved;
        let c1 = first.request_cancel(100, None).unwrap();
        let c2 = second.request_cancel(200, None).unwrap();

        store.save_all(vec![c1, first]).await.unwrap();
        let result = store.save_all(vec![c2.clone(), second]).await;
        assert!(matches!(result, Err(PaymentError::ConflictError(_))));

        // The losing batch left nothing behind.
        assert!(
            store
                .find_by_transaction_id(c2.transaction_id())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_find_cancellations() {
        let store = InMemoryTransactionStore::new();
        let mut parent = store.save(new_pay(1000)).await.unwrap();
        let parent_id = parent.transaction_id().clone();

        let c1 = parent.request_cancel(100, None).unwrap();
        let saved = store.save_all(vec![c1.clone(), parent]).await.unwrap();
        let mut parent = saved[1].clone();
        let c2 = parent.request_cancel(200, None).unwrap();
        store.save_all(vec![c2.clone(), parent]).await.unwrap();

        let children = store.find_cancellations(&parent_id).await.unwrap();
        let ids: Vec<_> = children.iter().map(|c| c.transaction_id().clone()).collect();
        assert_eq!(ids, vec![c1.transaction_id().clone(), c2.transaction_id().clone()]);

        let none = store.find_cancellations(c1.transaction_id()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_settlement_outbox() {
        let gateway = InMemorySettlementGateway::new();
        assert!(gateway.send("first").await.unwrap());
        assert!(gateway.send("second").await.unwrap());
        assert_eq!(gateway.messages().await, vec!["first", "second"]);
    }
}
