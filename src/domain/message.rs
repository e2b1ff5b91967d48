//! Fixed-width outbound record sent to the settlement counterpart.
//!
//! The layout is the [`FIELDS`] table: each entry is rendered in order and
//! concatenated. Any value wider than its slot is rejected rather than cut.

use crate::domain::card_cipher::CardInfo;
use crate::domain::transaction::TransactionType;
use crate::error::{PaymentError, Result};

/// Total length of an encoded record.
pub const MESSAGE_LEN: usize = 450;
/// Value carried in the length tag: the record length minus the tag itself.
const LENGTH_TAG: &str = "446";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pad {
    /// Right-justified, leading spaces.
    NumberSpaceLeft,
    /// Right-justified, leading zeros.
    NumberZeroLeft,
    /// Left-justified number, trailing spaces.
    NumberLeftJustified,
    /// Left-justified text, trailing spaces.
    Text,
}

impl Pad {
    fn apply(self, value: &str, width: usize) -> String {
        match self {
            Pad::NumberSpaceLeft => format!("{value:>width$}"),
            Pad::NumberZeroLeft => format!("{value:0>width$}"),
            Pad::NumberLeftJustified | Pad::Text => format!("{value:<width$}"),
        }
    }
}

/// Everything a record needs, borrowed from the transaction being encoded.
pub struct MessageFields<'a> {
    pub transaction_type: TransactionType,
    pub transaction_id: &'a str,
    /// Plaintext card data; for a CANCEL this is the parent's.
    pub card: &'a CardInfo,
    pub installment: u32,
    pub amount: u64,
    pub vat: u64,
    pub parent_transaction_id: Option<&'a str>,
    pub encrypted_card_info: &'a str,
}

pub struct Field {
    pub name: &'static str,
    pub width: usize,
    pub pad: Pad,
    pub select: fn(&MessageFields) -> String,
}

pub const FIELDS: [Field; 12] = [
    Field {
        name: "length",
        width: 4,
        pad: Pad::NumberSpaceLeft,
        select: |_| LENGTH_TAG.to_string(),
    },
    Field {
        name: "type",
        width: 10,
        pad: Pad::Text,
        select: |m| m.transaction_type.message_label().to_string(),
    },
    Field {
        name: "transaction_id",
        width: 20,
        pad: Pad::Text,
        select: |m| m.transaction_id.to_string(),
    },
    Field {
        name: "card_number",
        width: 20,
        pad: Pad::NumberLeftJustified,
        select: |m| m.card.card_number().to_string(),
    },
    Field {
        name: "installment",
        width: 2,
        pad: Pad::NumberZeroLeft,
        select: |m| m.installment.to_string(),
    },
    Field {
        name: "expiry",
        width: 4,
        pad: Pad::NumberLeftJustified,
        select: |m| m.card.expiry().to_string(),
    },
    Field {
        name: "cvc",
        width: 3,
        pad: Pad::NumberLeftJustified,
        select: |m| m.card.cvc().to_string(),
    },
    Field {
        name: "amount",
        width: 10,
        pad: Pad::NumberSpaceLeft,
        select: |m| m.amount.to_string(),
    },
    Field {
        name: "vat",
        width: 10,
        pad: Pad::NumberZeroLeft,
        select: |m| m.vat.to_string(),
    },
    Field {
        name: "parent_transaction_id",
        width: 20,
        pad: Pad::Text,
        select: |m| m.parent_transaction_id.unwrap_or_default().to_string(),
    },
    Field {
        name: "encrypted_card_info",
        width: 300,
        pad: Pad::Text,
        select: |m| m.encrypted_card_info.to_string(),
    },
    Field {
        name: "reserved",
        width: 47,
        pad: Pad::Text,
        select: |_| String::new(),
    },
];

/// Renders one record of exactly [`MESSAGE_LEN`] characters.
pub fn encode(fields: &MessageFields) -> Result<String> {
    let mut message = String::with_capacity(MESSAGE_LEN);
    for field in &FIELDS {
        let value = (field.select)(fields);
        if value.chars().count() > field.width {
            return Err(PaymentError::ValidationError(format!(
                "message field '{}' exceeds {} characters",
                field.name, field.width
            )));
        }
        message.push_str(&field.pad.apply(&value, field.width));
    }
    debug_assert_eq!(message.chars().count(), MESSAGE_LEN);
    Ok(message)
}
