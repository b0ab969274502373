use crate::domain::principal::SessionId;
use crate::domain::transaction::TransactionId;
use crate::domain::work::WorkId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Invalid payload for action '{action}': {source}")]
    InvalidPayload {
        action: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("Version conflict on transaction {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: TransactionId,
        expected: u64,
        found: u64,
    },
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Work item handler panicked: {0}")]
    HandlerPanicked(String),
    #[error("Worker pool is closed")]
    PoolClosed,
    #[error("Work item {0} was dropped without a result")]
    WorkerDropped(WorkId),
    #[error("Configuration error: {0}")]
    ConfigError(String),
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

/// Failure reported by a ledger client for a single submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("rejected by ledger: {0}")]
    Rejected(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
