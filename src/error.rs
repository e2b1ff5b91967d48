use thiserror::Error;

/// Every failure the ledger, its adapters and the batch CLI can raise.
///
/// The first five variants are the business taxonomy surfaced to callers;
/// the rest wrap infrastructure failures.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// A field failed validation before any state was touched.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Admission contention or a stale write. Safe to retry.
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("Transaction not found: {0}")]
    NotFoundError(String),
    /// A business rule rejected the request. Not a retry candidate.
    #[error("Illegal state: {0}")]
    IllegalStateError(String),
    /// Card data could not be encrypted or decrypted.
    #[error("Crypto failure: {0}")]
    CryptoError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Only conflicts are worth retrying; everything else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictError(_))
    }

    /// Short machine-readable label used in batch output.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation",
            Self::ConflictError(_) => "conflict",
            Self::NotFoundError(_) => "not_found",
            Self::IllegalStateError(_) => "illegal_state",
            Self::CryptoError(_) => "crypto",
            _ => "internal",
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
