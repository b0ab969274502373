use super::executor::TransactionExecutor;
use super::pool::WorkerPool;
use crate::config::EngineConfig;
use crate::domain::ports::{LedgerClientRef, SessionStoreRef, TransactionStoreRef};
use crate::domain::principal::SessionId;
use crate::domain::transaction::BatchId;
use crate::domain::work::{
    Job, ProcessBacklog, ProcessOutcome, ProcessTransactions, WorkItem,
};
use crate::error::Result;
use tracing::{error, info};

/// Collaborators the engine is wired with.
#[derive(Clone)]
pub struct EngineDeps {
    pub store: TransactionStoreRef,
    pub ledger: LedgerClientRef,
    pub sessions: SessionStoreRef,
}

/// The main entry point for ledger transaction execution.
///
/// `LedgerEngine` owns the worker pool. Starting it runs backlog recovery
/// once; afterwards business logic submits batches or transaction lists
/// through the dispatch methods.
pub struct LedgerEngine {
    pool: WorkerPool,
}

impl LedgerEngine {
    /// Starts the worker pool and recovers the backlog left by a previous run.
    ///
    /// Only an invalid configuration fails the start. The recovery pass is a
    /// work item like any other: its result is handed back next to the engine,
    /// and a failed pass leaves the engine usable.
    pub async fn start(
        config: EngineConfig,
        deps: EngineDeps,
    ) -> Result<(Self, Result<ProcessOutcome>)> {
        let executor = TransactionExecutor::new(deps.store, deps.ledger, deps.sessions);
        let pool = WorkerPool::start(&config, executor)?;
        let engine = Self { pool };

        let recovered = engine
            .pool
            .run(WorkItem::ProcessBacklog(ProcessBacklog::default()))
            .await;
        match &recovered {
            Ok(outcome) => info!(
                recovered = outcome.transactions.len(),
                "backlog recovery finished"
            ),
            Err(e) => error!(error = %e, "backlog recovery failed"),
        }

        Ok((engine, recovered))
    }

    /// Executes a batch or an explicit transaction list on any worker.
    pub async fn process_transactions(
        &self,
        request: ProcessTransactions,
    ) -> Result<ProcessOutcome> {
        self.pool.run(WorkItem::ProcessTransactions(request)).await
    }

    /// Re-submits every transaction of `batch_id`. Terminal ones are left as they are.
    pub async fn process_batch(
        &self,
        batch_id: BatchId,
        session_id: Option<SessionId>,
    ) -> Result<ProcessOutcome> {
        let mut request = ProcessTransactions::batch(batch_id);
        request.session_id = session_id;
        self.process_transactions(request).await
    }

    /// Dispatches a named action with a JSON payload. The worker decodes it;
    /// an unknown name comes back as an error.
    pub async fn dispatch_action(
        &self,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<ProcessOutcome> {
        self.pool
            .run(Job::Action {
                action: action.into(),
                payload,
            })
            .await
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Drains queued work and stops the workers.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
