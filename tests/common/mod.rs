#![allow(dead_code)]

use async_trait::async_trait;
use payledger::domain::ports::SettlementGateway;
use payledger::error::{PaymentError, Result};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;

pub const HEADER: &str = "op,ref,card_number,expiry,cvc,installment,amount,vat";

/// Writes a commands CSV with the standard header followed by `rows`.
pub fn commands_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// Settlement stub that parks every `send` until released, so a test can
/// hold a payment inside the admission window.
#[derive(Clone)]
pub struct ParkingGateway {
    entered: Arc<Semaphore>,
    release: Arc<Semaphore>,
}

impl Default for ParkingGateway {
    fn default() -> Self {
        Self {
            entered: Arc::new(Semaphore::new(0)),
            release: Arc::new(Semaphore::new(0)),
        }
    }
}

impl ParkingGateway {
    /// Waits until some `send` call has parked.
    pub async fn wait_entered(&self) {
        self.entered.acquire().await.unwrap().forget();
    }

    /// Lets one parked `send` complete.
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }
}

#[async_trait]
impl SettlementGateway for ParkingGateway {
    async fn send(&self, _message: &str) -> Result<bool> {
        self.entered.add_permits(1);
        self.release
            .acquire()
            .await
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?
            .forget();
        Ok(true)
    }
}
