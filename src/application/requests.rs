use crate::domain::card_cipher::CardInfo;
use crate::domain::transaction::{Transaction, TransactionId, TransactionType};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PayRequest {
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
    pub installment: u32,
    pub amount: u64,
    pub vat: Option<u64>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CancelRequest {
    pub amount: u64,
    pub vat: Option<u64>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct PayReceipt {
    pub transaction_id: TransactionId,
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
    pub installment: u32,
    pub amount: u64,
    pub vat: u64,
}

impl From<&Transaction> for PayReceipt {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.transaction_id().clone(),
            transaction_type: tx.transaction_type(),
            created_at: tx.created_at(),
            installment: tx.installment(),
            amount: tx.amount(),
            vat: tx.vat(),
        }
    }
}

/// Result of a cancellation: the new CANCEL record's figures plus what is
/// left on the payment it cancelled.
#[derive(Debug, PartialEq, Clone)]
pub struct CancelReceipt {
    pub transaction_id: TransactionId,
    pub parent_transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
    pub amount: u64,
    pub vat: u64,
    pub parent_remain_amount: u64,
    pub parent_remain_vat: u64,
}

/// A stored record with its decrypted card data and derived cancellations.
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub card: CardInfo,
    /// Empty for CANCEL records.
    pub cancellations: Vec<TransactionView>,
}
