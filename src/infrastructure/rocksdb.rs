use crate::domain::ports::{SessionStore, TransactionFilter, TransactionStore};
use crate::domain::principal::{Principal, Session, SessionId};
use crate::domain::transaction::{BatchId, Transaction, TransactionId};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteOptions};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing transactions.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for storing sessions.
pub const CF_SESSIONS: &str = "sessions";

/// A persistent store implementation using RocksDB.
///
/// Transactions are keyed by their big-endian id so iteration yields them in
/// id order. Every write is synced to the WAL before returning, which is what
/// lets an `Active` write survive a crash mid-submission.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes read-compare-write on transactions.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("transactions" and "sessions") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let cf_sessions = ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions, cf_sessions])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            EngineError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn synced() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        opts
    }

    fn read_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_transaction(&self, tx: &Transaction) -> Result<()> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let value = serde_json::to_vec(tx)?;
        self.db
            .put_cf_opt(cf, tx.id.to_be_bytes(), value, &Self::synced())?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn query(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;

        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let tx: Transaction = serde_json::from_slice(&value)?;
            if filter.matches(&tx) {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    async fn get_by_batch(&self, batch_id: &BatchId) -> Result<Vec<Transaction>> {
        self.query(TransactionFilter {
            state: None,
            batch_id: Some(batch_id.clone()),
        })
        .await
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.read_transaction(id)
    }

    async fn insert(&self, tx: Transaction) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.read_transaction(tx.id)?.is_some() {
            return Ok(false);
        }
        self.write_transaction(&tx)?;
        Ok(true)
    }

    async fn update(&self, tx: &Transaction, principal: &Principal) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let stored = self
            .read_transaction(tx.id)?
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
        self.write_transaction(&updated)?;
        Ok(updated)
    }
}

#[async_trait]
impl SessionStore for RocksDBStore {
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        let cf = self.cf(CF_SESSIONS)?;
        match self.db.get_cf(cf, id.0.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn store_session(&self, session: Session) -> Result<()> {
        let cf = self.cf(CF_SESSIONS)?;
        let value = serde_json::to_vec(&session)?;
        self.db
            .put_cf_opt(cf, session.id.0.as_bytes(), value, &Self::synced())?;
        Ok(())
    }
}
