use clap::Parser;
use ledger_executor::application::engine::{EngineDeps, LedgerEngine};
use ledger_executor::config::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, EngineConfig};
use ledger_executor::domain::ports::{
    SessionStoreRef, TransactionFilter, TransactionStore, TransactionStoreRef,
};
use ledger_executor::infrastructure::ledger::SimulatedLedger;
use ledger_executor::interfaces::csv::transaction_reader::TransactionReader;
use ledger_executor::interfaces::csv::transaction_writer::TransactionWriter;
use ledger_executor::logging::init_logging;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file of transactions to enqueue before the backlog is recovered
    input: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Number of workers executing transactions
    #[arg(long, env = "LEDGER_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Work items allowed to wait for a free worker
    #[arg(long, env = "LEDGER_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Debug logging for the engine
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&Path>) -> Result<(TransactionStoreRef, SessionStoreRef)> {
    use ledger_executor::infrastructure::in_memory::{
        InMemorySessionStore, InMemoryTransactionStore,
    };
    use ledger_executor::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            let transactions: TransactionStoreRef = Arc::new(store.clone());
            let sessions: SessionStoreRef = Arc::new(store);
            Ok((transactions, sessions))
        }
        None => {
            let transactions: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
            let sessions: SessionStoreRef = Arc::new(InMemorySessionStore::new());
            Ok((transactions, sessions))
        }
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&Path>) -> Result<(TransactionStoreRef, SessionStoreRef)> {
    use ledger_executor::infrastructure::in_memory::{
        InMemorySessionStore, InMemoryTransactionStore,
    };

    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    let transactions: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
    let sessions: SessionStoreRef = Arc::new(InMemorySessionStore::new());
    Ok((transactions, sessions))
}

/// Hands the input rows to the store as new transactions.
async fn enqueue(store: &dyn TransactionStore, input: &Path) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = TransactionReader::new(file);
    for tx_result in reader.transactions() {
        match tx_result {
            Ok(tx) => {
                let id = tx.id;
                if !store.insert(tx).await.into_diagnostic()? {
                    warn!(tx_id = id, "transaction already exists, skipping");
                }
            }
            Err(e) => {
                error!(error = %e, "Error reading transaction");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (store, sessions) = open_stores(cli.db_path.as_deref())?;

    if let Some(input) = &cli.input {
        enqueue(store.as_ref(), input).await?;
    }

    let config = EngineConfig {
        workers: cli.workers,
        queue_capacity: cli.queue_capacity,
    };
    let deps = EngineDeps {
        store: store.clone(),
        ledger: Arc::new(SimulatedLedger::new()),
        sessions,
    };

    let (engine, recovered) = LedgerEngine::start(config, deps).await.into_diagnostic()?;
    if let Ok(outcome) = &recovered {
        info!(
            transactions = outcome.transactions.len(),
            "processed backlog"
        );
    }
    engine.shutdown().await;

    // Report final state of every transaction
    let transactions = store
        .query(TransactionFilter::all())
        .await
        .into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = TransactionWriter::new(stdout.lock());
    writer
        .write_transactions(&transactions)
        .into_diagnostic()?;

    Ok(())
}
