use super::context::ExecutionContext;
use super::recovery::load_backlog;
use crate::domain::ports::{
    IdempotencyKey, LedgerClientRef, SessionStoreRef, TransactionStoreRef,
};
use crate::domain::transaction::Transaction;
use crate::domain::work::{ProcessBacklog, ProcessOutcome, ProcessTransactions, WorkItem};
use crate::error::{EngineError, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Runs work items against the transaction store and the ledger.
///
/// Cloning is cheap; every worker owns a clone. Transactions of one work item
/// are executed strictly one after the other.
#[derive(Clone)]
pub struct TransactionExecutor {
    store: TransactionStoreRef,
    ledger: LedgerClientRef,
    sessions: SessionStoreRef,
}

impl TransactionExecutor {
    pub fn new(
        store: TransactionStoreRef,
        ledger: LedgerClientRef,
        sessions: SessionStoreRef,
    ) -> Self {
        Self {
            store,
            ledger,
            sessions,
        }
    }

    pub async fn handle(&self, item: WorkItem) -> Result<ProcessOutcome> {
        match item {
            WorkItem::ProcessBacklog(request) => self.process_backlog(request).await,
            WorkItem::ProcessTransactions(request) => self.process_transactions(request).await,
        }
    }

    /// Loads interrupted and pending transactions and executes them as one list.
    pub async fn process_backlog(&self, request: ProcessBacklog) -> Result<ProcessOutcome> {
        let backlog = load_backlog(self.store.as_ref()).await?;
        self.process_transactions(ProcessTransactions {
            batch_id: None,
            transactions: Some(backlog),
            session_id: request.session_id,
        })
        .await
    }

    /// Executes an explicit transaction list, or the whole batch when only a
    /// batch id is given. Ledger failures are recorded on the transaction and
    /// never end the loop early.
    pub async fn process_transactions(
        &self,
        request: ProcessTransactions,
    ) -> Result<ProcessOutcome> {
        let ProcessTransactions {
            batch_id,
            transactions,
            session_id,
        } = request;

        let transactions = match (transactions, &batch_id) {
            (Some(transactions), _) => transactions,
            (None, Some(batch_id)) => self.store.get_by_batch(batch_id).await?,
            (None, None) => {
                return Err(EngineError::InvalidArgument(
                    "either a batch id or a transaction list is required".to_string(),
                ));
            }
        };

        let context = ExecutionContext::resolve(self.sessions.as_ref(), session_id).await?;

        info!(
            batch_id = batch_id.as_ref().map(|b| b.as_str()),
            count = transactions.len(),
            system = context.principal.is_system(),
            "processing transactions"
        );

        let mut visited = Vec::with_capacity(transactions.len());
        for tx in transactions {
            visited.push(self.execute(tx, &context).await?);
        }

        Ok(ProcessOutcome {
            batch_id,
            transactions: visited,
        })
    }

    /// Advances a single transaction to a terminal state.
    ///
    /// Only the id of `requested` is trusted: state and version are read back
    /// from the store. `Active` is persisted before the ledger is called, so a
    /// crash between the two leaves a transaction the next backlog pass picks
    /// up again.
    pub async fn execute(
        &self,
        requested: Transaction,
        context: &ExecutionContext,
    ) -> Result<Transaction> {
        let current = self
            .store
            .get(requested.id)
            .await?
            .ok_or(EngineError::TransactionNotFound(requested.id))?;

        if !current.is_executable() {
            debug!(tx_id = current.id, state = %current.state, "skipping transaction in terminal state");
            return Ok(current);
        }

        let mut tx = current.clone();
        tx.activate();
        let claimed = match self.store.update(&tx, &context.principal).await {
            Ok(claimed) => claimed,
            Err(EngineError::VersionConflict { found, .. }) => {
                warn!(
                    tx_id = tx.id,
                    stored_version = found,
                    "transaction changed since it was read, leaving it to its current owner"
                );
                return Ok(self.store.get(tx.id).await?.unwrap_or(current));
            }
            Err(e) => return Err(e),
        };

        let key = IdempotencyKey::for_transaction(claimed.id);
        let mut outcome = claimed.clone();
        match self.ledger.execute(&claimed, key).await {
            Ok(settlement) => {
                info!(tx_id = claimed.id, reference = %settlement.reference, "transaction complete");
                outcome.complete(settlement);
            }
            Err(e) => {
                warn!(tx_id = claimed.id, error = %e, "ledger rejected transaction");
                outcome.fail(Utc::now());
            }
        }

        self.store.update(&outcome, &context.principal).await
    }
}
