use super::command_reader::{Command, Operation};
use super::result_writer::OutcomeRow;
use crate::application::engine::PaymentEngine;
use std::collections::HashMap;

/// Runs batch commands against an engine, resolving `ref` labels of earlier
/// `pay` rows to the transaction ids they created.
pub struct BatchRunner<'a> {
    engine: &'a PaymentEngine,
    labels: HashMap<String, String>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a PaymentEngine) -> Self {
        Self {
            engine,
            labels: HashMap::new(),
        }
    }

    pub async fn run(&mut self, command: Command) -> OutcomeRow {
        let reference = command.reference.as_str();
        match command.op {
            Operation::Pay => {
                let result = match command.pay_request() {
                    Ok(request) => self.engine.pay(request).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(receipt) => {
                        self.labels
                            .insert(reference.to_string(), receipt.transaction_id.to_string());
                        OutcomeRow::paid(reference, &receipt)
                    }
                    Err(e) => OutcomeRow::failed(reference, &e),
                }
            }
            Operation::Cancel => {
                let target = self.resolve(reference);
                let result = match command.cancel_request() {
                    Ok(request) => self.engine.cancel(&target, request).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(receipt) => OutcomeRow::cancelled(reference, &receipt),
                    Err(e) => OutcomeRow::failed(reference, &e),
                }
            }
            Operation::Find => {
                let target = self.resolve(reference);
                match self.engine.find(&target).await {
                    Ok(view) => OutcomeRow::found(reference, &view),
                    Err(e) => OutcomeRow::failed(reference, &e),
                }
            }
        }
    }

    fn resolve(&self, reference: &str) -> String {
        self.labels
            .get(reference)
            .cloned()
            .unwrap_or_else(|| reference.to_string())
    }
}
