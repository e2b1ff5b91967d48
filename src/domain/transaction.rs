use crate::domain::card_cipher::{CardInfo, CardInfoCipher};
use crate::domain::message::{self, MessageFields};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Local, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TRANSACTION_ID_LEN: usize = 20;
pub const MAX_INSTALLMENT: u32 = 12;
pub const MIN_PAY_AMOUNT: u64 = 100;
pub const MAX_PAY_AMOUNT: u64 = 1_000_000_000;

const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S%3f";
const RANDOM_SUFFIX_BOUND: u32 = 100_000;

/// Twenty-character transaction identifier: `yyMMddHHmmssSSS` followed by a
/// zero-padded five digit random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    pub fn generate() -> Self {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let suffix = rand::thread_rng().gen_range(0..RANDOM_SUFFIX_BOUND);
        Self(format!("{timestamp}{suffix:05}"))
    }

    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != TRANSACTION_ID_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentError::ValidationError(format!(
                "transaction id must be {TRANSACTION_ID_LEN} digits: '{value}'"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Pay,
    Cancel,
}

impl TransactionType {
    /// Label written into the outbound record's type slot.
    pub fn message_label(self) -> &'static str {
        match self {
            TransactionType::Pay => "PAYMENT",
            TransactionType::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Pay => f.write_str("PAY"),
            TransactionType::Cancel => f.write_str("CANCEL"),
        }
    }
}

/// One ledger entry: a payment, or a cancellation against a payment.
///
/// A CANCEL points at its parent by id only. The parent's cancellations are
/// found through the store's parent index, never through an owned list.
///
/// Remaining balances can only move through [`Transaction::request_cancel`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    transaction_id: TransactionId,
    transaction_type: TransactionType,
    encrypted_card_info: String,
    message: String,
    installment: u32,
    amount: u64,
    vat: u64,
    remain_amount: u64,
    remain_vat: u64,
    parent_transaction_id: Option<TransactionId>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Transaction {
    /// Builds a new PAY record.
    ///
    /// When `vat` is omitted it is `amount / 11` rounded half-up.
    pub fn new_pay(
        card: CardInfo,
        installment: u32,
        amount: u64,
        vat: Option<u64>,
    ) -> Result<Self> {
        if installment > MAX_INSTALLMENT {
            return Err(PaymentError::ValidationError(format!(
                "installment must be between 0 and {MAX_INSTALLMENT}"
            )));
        }
        if !(MIN_PAY_AMOUNT..=MAX_PAY_AMOUNT).contains(&amount) {
            return Err(PaymentError::ValidationError(format!(
                "amount must be between {MIN_PAY_AMOUNT} and {MAX_PAY_AMOUNT}"
            )));
        }

        let vat = match vat {
            Some(vat) => vat,
            None => default_vat(amount)?,
        };
        if vat > amount {
            return Err(PaymentError::IllegalStateError(
                "vat can not be greater than amount".to_string(),
            ));
        }

        let transaction_id = TransactionId::generate();
        let encrypted_card_info = CardInfoCipher::encrypt(transaction_id.as_str(), &card)?;
        let message = message::encode(&MessageFields {
            transaction_type: TransactionType::Pay,
            transaction_id: transaction_id.as_str(),
            card: &card,
            installment,
            amount,
            vat,
            parent_transaction_id: None,
            encrypted_card_info: &encrypted_card_info,
        })?;

        Ok(Self {
            transaction_id,
            transaction_type: TransactionType::Pay,
            encrypted_card_info,
            message,
            installment,
            amount,
            vat,
            remain_amount: amount,
            remain_vat: vat,
            parent_transaction_id: None,
            created_at: Utc::now(),
            updated_at: None,
            version: 0,
        })
    }

    /// A PAY with a balance left to cancel.
    pub fn is_cancellable(&self) -> bool {
        self.transaction_type == TransactionType::Pay && self.remain_amount > 0
    }

    /// Cancels part or all of this payment and returns the CANCEL record.
    ///
    /// On success this record's remaining balances are lowered by the
    /// cancelled amount and vat. On failure nothing changes.
    pub fn request_cancel(
        &mut self,
        requested_amount: u64,
        requested_vat: Option<u64>,
    ) -> Result<Transaction> {
        if !self.is_cancellable() {
            return Err(PaymentError::IllegalStateError(format!(
                "transaction {} is not cancellable",
                self.transaction_id
            )));
        }
        if requested_amount == 0 {
            return Err(PaymentError::ValidationError(
                "cancel amount must be positive".to_string(),
            ));
        }

        let requested_vat = match requested_vat {
            Some(vat) => vat,
            None => default_vat(requested_amount)?.min(self.remain_vat),
        };

        if requested_vat > requested_amount {
            return Err(PaymentError::IllegalStateError(
                "requested vat is greater than requested amount".to_string(),
            ));
        }
        let remain_amount = self.remain_amount.checked_sub(requested_amount).ok_or_else(|| {
            PaymentError::IllegalStateError(format!(
                "requested amount {requested_amount} exceeds remaining amount {}",
                self.remain_amount
            ))
        })?;
        let remain_vat = self.remain_vat.checked_sub(requested_vat).ok_or_else(|| {
            PaymentError::IllegalStateError(format!(
                "requested vat {requested_vat} exceeds remaining vat {}",
                self.remain_vat
            ))
        })?;
        if remain_amount == 0 && remain_vat > 0 {
            return Err(PaymentError::IllegalStateError(format!(
                "cancel would leave vat {remain_vat} with no remaining amount"
            )));
        }

        let card = self.card_info()?;
        let transaction_id = TransactionId::generate();
        let encrypted_card_info = CardInfoCipher::encrypt(self.transaction_id.as_str(), &card)?;
        let message = message::encode(&MessageFields {
            transaction_type: TransactionType::Cancel,
            transaction_id: transaction_id.as_str(),
            card: &card,
            installment: 0,
            amount: requested_amount,
            vat: requested_vat,
            parent_transaction_id: Some(self.transaction_id.as_str()),
            encrypted_card_info: &encrypted_card_info,
        })?;

        let cancel = Self {
            transaction_id,
            transaction_type: TransactionType::Cancel,
            encrypted_card_info,
            message,
            installment: 0,
            amount: requested_amount,
            vat: requested_vat,
            remain_amount: requested_amount,
            remain_vat: requested_vat,
            parent_transaction_id: Some(self.transaction_id.clone()),
            created_at: Utc::now(),
            updated_at: None,
            version: 0,
        };

        self.remain_amount = remain_amount;
        self.remain_vat = remain_vat;
        Ok(cancel)
    }

    /// Decrypts the card fields. A CANCEL's blob is keyed by its parent's id.
    pub fn card_info(&self) -> Result<CardInfo> {
        CardInfoCipher::decrypt(self.key_owner().as_str(), &self.encrypted_card_info)
    }

    fn key_owner(&self) -> &TransactionId {
        match (&self.transaction_type, &self.parent_transaction_id) {
            (TransactionType::Cancel, Some(parent)) => parent,
            _ => &self.transaction_id,
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn encrypted_card_info(&self) -> &str {
        &self.encrypted_card_info
    }

    /// The encoded outbound record for this transaction.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn installment(&self) -> u32 {
        self.installment
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn vat(&self) -> u64 {
        self.vat
    }

    pub fn remain_amount(&self) -> u64 {
        self.remain_amount
    }

    pub fn remain_vat(&self) -> u64 {
        self.remain_vat
    }

    pub fn parent_transaction_id(&self) -> Option<&TransactionId> {
        self.parent_transaction_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Optimistic-concurrency token. Zero until the record is first stored.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Applied by a store when it commits this record.
    pub(crate) fn mark_stored(&mut self, now: DateTime<Utc>) {
        if self.version > 0 {
            self.updated_at = Some(now);
        }
        self.version += 1;
    }
}

/// `amount / 11`, rounded half-up.
pub fn default_vat(amount: u64) -> Result<u64> {
    (Decimal::from(amount) / dec!(11))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| PaymentError::internal(format!("vat for {amount} out of range")))
}
