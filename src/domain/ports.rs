use super::principal::{Principal, Session, SessionId};
use super::transaction::{BatchId, Settlement, Transaction, TransactionId, TransactionState};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Selects transactions by state and/or batch. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub state: Option<TransactionState>,
    pub batch_id: Option<BatchId>,
}

impl TransactionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_state(state: TransactionState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.state.is_none_or(|state| tx.state == state)
            && self
                .batch_id
                .as_ref()
                .is_none_or(|batch| tx.batch_id.as_ref() == Some(batch))
    }
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Returns matching transactions ordered by id.
    async fn query(&self, filter: TransactionFilter) -> Result<Vec<Transaction>>;
    async fn get_by_batch(&self, batch_id: &BatchId) -> Result<Vec<Transaction>>;
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>>;
    /// Persists a new transaction. Returns `false` if the id already exists.
    async fn insert(&self, tx: Transaction) -> Result<bool>;
    /// Durably writes `tx` if its `version` matches the stored one, attributing
    /// the change to `principal`. Returns the stored copy with the bumped version.
    async fn update(&self, tx: &Transaction, principal: &Principal) -> Result<Transaction>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>>;
    async fn store_session(&self, session: Session) -> Result<()>;
}

/// Token the ledger uses to recognise a re-sent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn for_transaction(id: TransactionId) -> Self {
        Self(format!("ltx-{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client of the external ledger.
///
/// The engine submits at-least-once: a transaction left `Active` by a crash is
/// sent again after restart with the same `IdempotencyKey`. Implementations
/// must not settle the same key twice.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn execute(
        &self,
        tx: &Transaction,
        key: IdempotencyKey,
    ) -> std::result::Result<Settlement, LedgerError>;
}

pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type SessionStoreRef = Arc<dyn SessionStore>;
pub type LedgerClientRef = Arc<dyn LedgerClient>;
