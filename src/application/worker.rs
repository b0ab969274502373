use super::executor::TransactionExecutor;
use crate::domain::work::{Job, ProcessOutcome, WorkId, WorkItem};
use crate::error::{EngineError, Result};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, debug, error, info, info_span, warn};

pub type WorkerId = usize;

/// A work item on its way to a worker.
#[derive(Debug)]
pub struct WorkRequest {
    pub work_id: WorkId,
    pub job: Job,
}

/// The single reply a worker sends for each request.
#[derive(Debug)]
pub struct WorkResult {
    pub work_id: WorkId,
    pub worker_id: WorkerId,
    pub outcome: Result<ProcessOutcome>,
}

/// Shared end of the request queue. Whichever idle worker holds the lock
/// receives the next request.
pub type RequestQueue = Arc<Mutex<mpsc::Receiver<WorkRequest>>>;

pub struct Worker {
    id: WorkerId,
    executor: TransactionExecutor,
}

impl Worker {
    pub fn new(id: WorkerId, executor: TransactionExecutor) -> Self {
        Self { id, executor }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Handles requests one at a time until the queue closes or nobody
    /// listens for results anymore. A failing item is reported, never fatal.
    pub async fn run(self, requests: RequestQueue, results: mpsc::Sender<WorkResult>) {
        info!(worker = self.id, "worker started");

        loop {
            let request = {
                let mut requests = requests.lock().await;
                requests.recv().await
            };
            let Some(WorkRequest { work_id, job }) = request else {
                break;
            };

            let span = info_span!("work_item", worker = self.id, work_id);
            let outcome = self.run_job(job).instrument(span).await;
            if let Err(e) = &outcome {
                error!(worker = self.id, work_id, error = %e, "work item failed");
            }

            let result = WorkResult {
                work_id,
                worker_id: self.id,
                outcome,
            };
            if results.send(result).await.is_err() {
                warn!(worker = self.id, "result channel closed");
                break;
            }
        }

        info!(worker = self.id, "worker stopped");
    }

    /// Decodes and runs a single job. Panics inside the handler are turned
    /// into an error result.
    pub async fn run_job(&self, job: Job) -> Result<ProcessOutcome> {
        let item = match job {
            Job::Item(item) => item,
            Job::Action { action, payload } => WorkItem::from_action(&action, payload)?,
        };
        debug!(action = item.action(), "handling work item");

        let executor = self.executor.clone();
        let handler = tokio::spawn(async move { executor.handle(item).await }.in_current_span());
        match handler.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(EngineError::HandlerPanicked(panic_message(
                e.into_panic(),
            ))),
            Err(e) => Err(EngineError::HandlerPanicked(e.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{IdempotencyKey, LedgerClient, TransactionStore};
    use crate::domain::transaction::{
        Amount, BatchId, Settlement, Transaction, TransactionState, Transfer,
    };
    use crate::error::LedgerError;
    use crate::infrastructure::in_memory::{InMemorySessionStore, InMemoryTransactionStore};
    use crate::infrastructure::ledger::SimulatedLedger;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::json;

    struct PanickingLedger;

    #[async_trait]
    impl LedgerClient for PanickingLedger {
        async fn execute(
            &self,
            _tx: &Transaction,
            _key: IdempotencyKey,
        ) -> std::result::Result<Settlement, LedgerError> {
            panic!("ledger connection reset");
        }
    }

    fn worker_with(ledger: Arc<dyn LedgerClient>) -> (Worker, Arc<InMemoryTransactionStore>) {
        let store = Arc::new(InMemoryTransactionStore::new());
        let executor =
            TransactionExecutor::new(store.clone(), ledger, Arc::new(InMemorySessionStore::new()));
        (Worker::new(0, executor), store)
    }

    async fn seed(store: &InMemoryTransactionStore, id: u64) {
        store
            .insert(Transaction::pending(
                id,
                Some(BatchId::new("b1")),
                Transfer {
                    source_wallet: "alice".to_string(),
                    destination_wallet: "bob".to_string(),
                    amount: Amount::new(dec!(5.0)).unwrap(),
                },
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_job_decodes_actions() {
        let (worker, store) = worker_with(Arc::new(SimulatedLedger::new()));
        seed(&store, 1).await;

        let outcome = worker
            .run_job(Job::Action {
                action: "processTransactions".to_string(),
                payload: json!({ "batchId": "b1" }),
            })
            .await
            .unwrap();

        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.transactions[0].state, TransactionState::Complete);
    }

    #[tokio::test]
    async fn test_unknown_action_is_an_error_result() {
        let (worker, _store) = worker_with(Arc::new(SimulatedLedger::new()));
        let result = worker
            .run_job(Job::Action {
                action: "mintMoney".to_string(),
                payload: json!({}),
            })
            .await;
        assert!(matches!(result, Err(EngineError::UnknownAction(_))));
    }

    #[tokio::test]
    async fn test_handler_panic_is_an_error_result() {
        let (worker, store) = worker_with(Arc::new(PanickingLedger));
        seed(&store, 1).await;

        let result = worker
            .run_job(Job::Action {
                action: "processBacklog".to_string(),
                payload: json!({}),
            })
            .await;

        assert!(
            matches!(result, Err(EngineError::HandlerPanicked(ref msg)) if msg.contains("ledger connection reset"))
        );
        // The write-ahead happened before the panic.
        assert_eq!(
            store.get(1).await.unwrap().unwrap().state,
            TransactionState::Active
        );
    }

    #[tokio::test]
    async fn test_worker_loop_survives_bad_items() {
        let (worker, store) = worker_with(Arc::new(SimulatedLedger::new()));
        seed(&store, 1).await;

        let (request_tx, request_rx) = mpsc::channel(4);
        let (result_tx, mut result_rx) = mpsc::channel(4);
        let handle = tokio::spawn(worker.run(Arc::new(Mutex::new(request_rx)), result_tx));

        request_tx
            .send(WorkRequest {
                work_id: 1,
                job: Job::Action {
                    action: "bogus".to_string(),
                    payload: json!({}),
                },
            })
            .await
            .unwrap();
        request_tx
            .send(WorkRequest {
                work_id: 2,
                job: Job::Action {
                    action: "processTransactions".to_string(),
                    payload: json!({}),
                },
            })
            .await
            .unwrap();
        request_tx
            .send(WorkRequest {
                work_id: 3,
                job: Job::Action {
                    action: "processTransactions".to_string(),
                    payload: json!({ "batchId": "b1" }),
                },
            })
            .await
            .unwrap();
        drop(request_tx);

        let first = result_rx.recv().await.unwrap();
        assert_eq!(first.work_id, 1);
        assert!(matches!(first.outcome, Err(EngineError::UnknownAction(_))));

        let second = result_rx.recv().await.unwrap();
        assert_eq!(second.work_id, 2);
        assert!(matches!(second.outcome, Err(EngineError::InvalidArgument(_))));

        let third = result_rx.recv().await.unwrap();
        assert_eq!(third.work_id, 3);
        assert_eq!(third.worker_id, 0);
        assert!(third.outcome.is_ok());

        handle.await.unwrap();
        assert!(result_rx.recv().await.is_none());
    }
}
