use super::executor::TransactionExecutor;
use super::worker::{WorkRequest, WorkResult, Worker};
use crate::config::EngineConfig;
use crate::domain::work::{Job, ProcessOutcome, WorkId};
use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type ReplySlots = HashMap<WorkId, oneshot::Sender<Result<ProcessOutcome>>>;
type PendingResults = Arc<Mutex<ReplySlots>>;

// Never held across an await.
fn lock_pending(pending: &PendingResults) -> MutexGuard<'_, ReplySlots> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frees a caller's reply slot once its `run` future completes or is dropped.
struct PendingSlot<'a> {
    pending: &'a PendingResults,
    work_id: WorkId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.work_id);
    }
}

/// A fixed set of workers fed from one bounded queue.
///
/// `run` hands a job to whichever worker is free and resolves once the result
/// carrying the same `WorkId` comes back. Jobs submitted independently may
/// complete in any order.
pub struct WorkerPool {
    requests: mpsc::Sender<WorkRequest>,
    pending: PendingResults,
    next_work_id: AtomicU64,
    workers: Vec<JoinHandle<()>>,
    router: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawns `config.workers` workers sharing `executor`.
    pub fn start(config: &EngineConfig, executor: TransactionExecutor) -> Result<Self> {
        config.validate()?;

        let (request_tx, request_rx) = mpsc::channel(config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(config.queue_capacity);
        let requests = Arc::new(tokio::sync::Mutex::new(request_rx));
        let pending: PendingResults = Arc::new(Mutex::new(HashMap::new()));

        let workers = (0..config.workers)
            .map(|id| {
                let worker = Worker::new(id, executor.clone());
                tokio::spawn(worker.run(requests.clone(), result_tx.clone()))
            })
            .collect();
        let router = tokio::spawn(route_results(result_rx, pending.clone()));

        info!(workers = config.workers, "worker pool started");

        Ok(Self {
            requests: request_tx,
            pending,
            next_work_id: AtomicU64::new(1),
            workers,
            router,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Runs `job` on any worker and waits for its result.
    ///
    /// Dropping the returned future gives up the result; the item itself may
    /// still run if it was already queued.
    pub async fn run(&self, job: impl Into<Job>) -> Result<ProcessOutcome> {
        let work_id = self.next_work_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        lock_pending(&self.pending).insert(work_id, reply_tx);
        let _slot = PendingSlot {
            pending: &self.pending,
            work_id,
        };

        let request = WorkRequest {
            work_id,
            job: job.into(),
        };
        if self.requests.send(request).await.is_err() {
            return Err(EngineError::PoolClosed);
        }
        debug!(work_id, "work item queued");

        reply_rx
            .await
            .map_err(|_| EngineError::WorkerDropped(work_id))?
    }

    /// Stops accepting work, lets workers drain the queue and waits for them.
    pub async fn shutdown(self) {
        let Self {
            requests,
            workers,
            router,
            ..
        } = self;
        drop(requests);

        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        if let Err(e) = router.await {
            warn!(error = %e, "result router ended abnormally");
        }
        info!("worker pool stopped");
    }
}

/// Resolves each caller's pending future with the result of its work item.
///
/// Stops once every worker is gone. Callers still waiting at that point get
/// `WorkerDropped`.
async fn route_results(mut results: mpsc::Receiver<WorkResult>, pending: PendingResults) {
    while let Some(result) = results.recv().await {
        let work_id = result.work_id;
        let waiter = lock_pending(&pending).remove(&work_id);
        match waiter {
            Some(waiter) => {
                if waiter.send(result.outcome).is_err() {
                    debug!(work_id, "caller stopped waiting for result");
                }
            }
            None => debug!(
                work_id,
                worker = result.worker_id,
                "no caller waiting for result"
            ),
        }
    }

    let mut unresolved = lock_pending(&pending);
    if !unresolved.is_empty() {
        warn!(
            unresolved = unresolved.len(),
            "all workers stopped with work items outstanding"
        );
    }
    unresolved.clear();
}
