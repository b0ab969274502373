//! Application layer containing the execution engine.
//!
//! `LedgerEngine` is the entry point. It owns a `WorkerPool` whose workers run
//! `TransactionExecutor` over `tokio` channels, one work item at a time each.

pub mod context;
pub mod engine;
pub mod executor;
pub mod pool;
pub mod recovery;
pub mod worker;
