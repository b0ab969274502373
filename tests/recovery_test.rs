mod common;

use common::{CrashingLedger, ScriptedLedger, transaction};
use ledger_executor::application::engine::{EngineDeps, LedgerEngine};
use ledger_executor::config::EngineConfig;
use ledger_executor::domain::ports::{LedgerClient, TransactionFilter, TransactionStore};
use ledger_executor::domain::transaction::{BatchId, TransactionState};
use ledger_executor::domain::work::ProcessTransactions;
use ledger_executor::error::EngineError;
use ledger_executor::infrastructure::in_memory::{InMemorySessionStore, InMemoryTransactionStore};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

fn deps(store: Arc<InMemoryTransactionStore>, ledger: Arc<dyn LedgerClient>) -> EngineDeps {
    EngineDeps {
        store,
        ledger,
        sessions: Arc::new(InMemorySessionStore::new()),
    }
}

#[tokio::test]
async fn test_batch_of_three_with_middle_failure() {
    let store = Arc::new(InMemoryTransactionStore::new());
    let ledger = Arc::new(ScriptedLedger::failing([2]));
    let (engine, _) = LedgerEngine::start(EngineConfig::default(), deps(store.clone(), ledger.clone()))
        .await
        .unwrap();

    for id in 1..=3 {
        store
            .insert(transaction(id, "checkout-1", TransactionState::Pending))
            .await
            .unwrap();
    }

    let outcome = engine
        .process_transactions(ProcessTransactions::batch(BatchId::new("checkout-1")))
        .await
        .expect("a ledger failure must not fail the work item");

    assert_eq!(outcome.batch_id, Some(BatchId::new("checkout-1")));
    assert_eq!(ledger.calls(), vec![1, 2, 3]);

    let states: Vec<_> = outcome.transactions.iter().map(|tx| tx.state).collect();
    assert_eq!(
        states,
        vec![
            TransactionState::Complete,
            TransactionState::Failed,
            TransactionState::Complete
        ]
    );
    let failed = store.get(2).await.unwrap().unwrap();
    assert!(failed.posting_date.is_some());

    engine.shutdown().await;
}

#[tokio::test]
async fn test_crash_after_activation_is_recovered_on_next_start() {
    let store = Arc::new(InMemoryTransactionStore::new());
    store
        .insert(transaction(1, "b1", TransactionState::Pending))
        .await
        .unwrap();

    // First run: the ledger call never returns normally
    let (first, recovered) = LedgerEngine::start(
        EngineConfig::default(),
        deps(store.clone(), Arc::new(CrashingLedger::on([1]))),
    )
    .await
    .unwrap();
    assert!(matches!(recovered, Err(EngineError::HandlerPanicked(_))));
    assert_eq!(
        store.get(1).await.unwrap().unwrap().state,
        TransactionState::Active
    );
    first.shutdown().await;

    // Next start picks it up again
    let ledger = Arc::new(ScriptedLedger::default());
    let (engine, recovered) =
        LedgerEngine::start(EngineConfig::default(), deps(store.clone(), ledger.clone()))
            .await
            .unwrap();

    assert_eq!(ledger.calls(), vec![1]);
    assert_eq!(recovered.unwrap().transactions.len(), 1);
    assert_eq!(
        store.get(1).await.unwrap().unwrap().state,
        TransactionState::Complete
    );

    engine.shutdown().await;
}

#[tokio::test]
async fn test_failed_recovery_leaves_engine_usable() {
    let store = Arc::new(InMemoryTransactionStore::new());
    store
        .insert(transaction(1, "poisoned", TransactionState::Pending))
        .await
        .unwrap();
    store
        .insert(transaction(2, "healthy", TransactionState::Pending))
        .await
        .unwrap();

    let (engine, recovered) = LedgerEngine::start(
        EngineConfig::default(),
        deps(store.clone(), Arc::new(CrashingLedger::on([1]))),
    )
    .await
    .unwrap();

    assert!(
        matches!(recovered, Err(EngineError::HandlerPanicked(ref msg)) if msg.contains("tx 1"))
    );
    assert_eq!(engine.workers(), 1);

    // The worker that ran the failed pass still serves new items.
    let outcome = engine
        .process_batch(BatchId::new("healthy"), None)
        .await
        .unwrap();
    assert_eq!(outcome.transactions[0].state, TransactionState::Complete);
    assert_eq!(
        store.get(1).await.unwrap().unwrap().state,
        TransactionState::Active
    );

    engine.shutdown().await;
}

#[tokio::test]
async fn test_every_executable_transaction_ends_terminal() {
    let store = Arc::new(InMemoryTransactionStore::new());
    let mut rng = rand::thread_rng();
    let states = [
        TransactionState::Pending,
        TransactionState::Active,
        TransactionState::Complete,
        TransactionState::Failed,
    ];

    let mut seeded = HashMap::new();
    let mut failing = Vec::new();
    for id in 1..=200u64 {
        let tx = transaction(id, &format!("b{}", id % 7), states[rng.gen_range(0..states.len())]);
        if rng.gen_bool(0.3) {
            failing.push(id);
        }
        seeded.insert(id, tx.clone());
        store.insert(tx).await.unwrap();
    }

    let ledger = Arc::new(ScriptedLedger::failing(failing));
    let (engine, recovered) = LedgerEngine::start(
        EngineConfig::default().with_workers(4),
        deps(store.clone(), ledger.clone()),
    )
    .await
    .unwrap();
    let recovered = recovered.unwrap();

    let executable = seeded.values().filter(|tx| tx.is_executable()).count();
    assert_eq!(recovered.transactions.len(), executable);
    assert_eq!(ledger.calls().len(), executable);

    for tx in store.query(TransactionFilter::all()).await.unwrap() {
        let before = &seeded[&tx.id];
        assert!(tx.state.is_terminal(), "transaction {} left {}", tx.id, tx.state);
        if before.state.is_terminal() {
            assert_eq!(&tx, before, "terminal transaction {} was modified", tx.id);
        }
    }

    engine.shutdown().await;
}
