use crate::error::EngineError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type TransactionId = u64;

/// Grouping key shared by transactions that are executed together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a positive monetary amount for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::InvalidArgument(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Ledger payload of a transaction. Only the ledger client reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub source_wallet: String,
    pub destination_wallet: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    /// Submitted, not yet attempted.
    Pending,
    /// Execution started; the ledger outcome is unknown until a terminal write.
    Active,
    /// Accepted by the ledger.
    Complete,
    /// Rejected by the ledger, or the attempt errored.
    Failed,
}

impl TransactionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Settlement details returned by the ledger for an accepted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub reference: String,
    pub posted_at: DateTime<Utc>,
}

/// A ledger transaction as persisted by the transaction store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub state: TransactionState,
    pub batch_id: Option<BatchId>,
    pub posting_date: Option<DateTime<Utc>>,
    pub transfer: Transfer,
    pub ledger_reference: Option<String>,
    /// Optimistic-concurrency token, bumped by the store on every update.
    #[serde(default)]
    pub version: u64,
    /// User that attributed the last update.
    #[serde(default)]
    pub updated_by: Option<Uuid>,
}

impl Transaction {
    /// Creates a `Pending` transaction, the way producers hand them to the store.
    pub fn pending(id: TransactionId, batch_id: Option<BatchId>, transfer: Transfer) -> Self {
        Self {
            id,
            state: TransactionState::Pending,
            batch_id,
            posting_date: None,
            transfer,
            ledger_reference: None,
            version: 0,
            updated_by: None,
        }
    }

    /// Only `Pending` and `Active` transactions may be (re-)attempted.
    pub fn is_executable(&self) -> bool {
        matches!(
            self.state,
            TransactionState::Pending | TransactionState::Active
        )
    }

    pub fn activate(&mut self) {
        self.state = TransactionState::Active;
    }

    pub fn complete(&mut self, settlement: Settlement) {
        self.state = TransactionState::Complete;
        self.ledger_reference = Some(settlement.reference);
        self.posting_date = Some(settlement.posted_at);
    }

    pub fn fail(&mut self, now: DateTime<Utc>) {
        self.state = TransactionState::Failed;
        self.posting_date = Some(now);
    }
}
