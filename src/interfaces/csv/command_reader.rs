use crate::application::requests::{CancelRequest, PayRequest};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Pay,
    Cancel,
    Find,
}

/// One row of a batch file.
///
/// For `pay`, `reference` labels the created transaction. For `cancel` and
/// `find`, it is either such a label or a literal transaction id.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub op: Operation,
    #[serde(rename = "ref")]
    pub reference: String,
    pub card_number: Option<String>,
    pub expiry: Option<String>,
    pub cvc: Option<String>,
    pub installment: Option<u32>,
    pub amount: Option<u64>,
    pub vat: Option<u64>,
}

impl Command {
    pub fn pay_request(&self) -> Result<PayRequest> {
        Ok(PayRequest {
            card_number: required(&self.card_number, "card_number")?,
            expiry: required(&self.expiry, "expiry")?,
            cvc: required(&self.cvc, "cvc")?,
            installment: self.installment.unwrap_or(0),
            amount: self
                .amount
                .ok_or_else(|| missing("amount"))?,
            vat: self.vat,
        })
    }

    pub fn cancel_request(&self) -> Result<CancelRequest> {
        Ok(CancelRequest {
            amount: self.amount.ok_or_else(|| missing("amount"))?,
            vat: self.vat,
        })
    }
}

fn required(field: &Option<String>, name: &str) -> Result<String> {
    field.clone().ok_or_else(|| missing(name))
}

fn missing(name: &str) -> PaymentError {
    PaymentError::ValidationError(format!("{name} is mandatory"))
}

/// Reads batch commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
