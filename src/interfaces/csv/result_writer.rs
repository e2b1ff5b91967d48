use crate::application::requests::{CancelReceipt, PayReceipt, TransactionView};
use crate::domain::transaction::TransactionType;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::io::Write;

/// One output row per processed command. Card data is never written.
#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct OutcomeRow {
    #[serde(rename = "ref")]
    pub reference: String,
    pub transaction_id: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: Option<u64>,
    pub vat: Option<u64>,
    pub remain_amount: Option<u64>,
    pub remain_vat: Option<u64>,
    pub parent_id: String,
    pub cancellations: Option<usize>,
    pub status: String,
}

impl OutcomeRow {
    pub fn paid(reference: &str, receipt: &PayReceipt) -> Self {
        Self {
            reference: reference.to_string(),
            transaction_id: receipt.transaction_id.to_string(),
            transaction_type: receipt.transaction_type.to_string(),
            amount: Some(receipt.amount),
            vat: Some(receipt.vat),
            remain_amount: Some(receipt.amount),
            remain_vat: Some(receipt.vat),
            cancellations: Some(0),
            status: "ok".to_string(),
            ..Self::default()
        }
    }

    /// Remaining balances are the parent's after the cancellation.
    pub fn cancelled(reference: &str, receipt: &CancelReceipt) -> Self {
        Self {
            reference: reference.to_string(),
            transaction_id: receipt.transaction_id.to_string(),
            transaction_type: TransactionType::Cancel.to_string(),
            amount: Some(receipt.amount),
            vat: Some(receipt.vat),
            remain_amount: Some(receipt.parent_remain_amount),
            remain_vat: Some(receipt.parent_remain_vat),
            parent_id: receipt.parent_transaction_id.to_string(),
            status: "ok".to_string(),
            ..Self::default()
        }
    }

    pub fn found(reference: &str, view: &TransactionView) -> Self {
        let tx = &view.transaction;
        Self {
            reference: reference.to_string(),
            transaction_id: tx.transaction_id().to_string(),
            transaction_type: tx.transaction_type().to_string(),
            amount: Some(tx.amount()),
            vat: Some(tx.vat()),
            remain_amount: Some(tx.remain_amount()),
            remain_vat: Some(tx.remain_vat()),
            parent_id: tx
                .parent_transaction_id()
                .map(ToString::to_string)
                .unwrap_or_default(),
            cancellations: Some(view.cancellations.len()),
            status: "ok".to_string(),
        }
    }

    pub fn failed(reference: &str, error: &PaymentError) -> Self {
        Self {
            reference: reference.to_string(),
            status: error.category().to_string(),
            ..Self::default()
        }
    }
}

/// Writes [`OutcomeRow`]s as CSV with a header line.
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, row: &OutcomeRow) -> Result<()> {
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_failure_row() {
        let mut buf = Vec::new();
        {
            let mut writer = ResultWriter::new(&mut buf);
            let error = PaymentError::NotFoundError("x".to_string());
            writer.write(&OutcomeRow::failed("p9", &error)).unwrap();
            writer.flush().unwrap();
        }
        let output = String::from_utf8(buf).unwrap();
        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ref,transaction_id,type,amount,vat,remain_amount,remain_vat,parent_id,cancellations,status"
        );
        assert_eq!(lines.next().unwrap(), "p9,,,,,,,,,not_found");
    }
}
