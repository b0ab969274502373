use crate::domain::ports::{SessionStore, TransactionFilter, TransactionStore};
use crate::domain::principal::{Principal, Session, SessionId};
use crate::domain::transaction::{BatchId, Transaction, TransactionId};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for transactions.
///
/// Uses `Arc<RwLock<BTreeMap<TransactionId, Transaction>>>` so clones share the
/// same data and queries come back ordered by id. The write lock serializes
/// concurrent `update` calls, which is where the version check happens.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<BTreeMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn query(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    async fn get_by_batch(&self, batch_id: &BatchId) -> Result<Vec<Transaction>> {
        self.query(TransactionFilter {
            state: None,
            batch_id: Some(batch_id.clone()),
        })
        .await
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&id).cloned())
    }

    async fn insert(&self, tx: Transaction) -> Result<bool> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Ok(false);
        }
        transactions.insert(tx.id, tx);
        Ok(true)
    }

    async fn update(&self, tx: &Transaction, principal: &Principal) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        let stored = transactions
            .get_mut(&tx.id)
            .ok_or(EngineError::TransactionNotFound(tx.id))?;

        if stored.version != tx.version {
            return Err(EngineError::VersionConflict {
                id: tx.id,
                expected: tx.version,
                found: stored.version,
            });
        }

        let mut updated = tx.clone();
        updated.version = tx.version + 1;
        updated.updated_by = Some(principal.user_id);
        *stored = updated.clone();
        Ok(updated)
    }
}

/// A thread-safe in-memory store for sessions.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn store_session(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session);
        Ok(())
    }
}
