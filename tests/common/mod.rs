#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use ledger_executor::domain::ports::{IdempotencyKey, LedgerClient};
use ledger_executor::domain::transaction::{
    Amount, BatchId, Settlement, Transaction, TransactionId, TransactionState, Transfer,
};
use ledger_executor::error::LedgerError;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Mutex;

pub fn transaction(id: TransactionId, batch: &str, state: TransactionState) -> Transaction {
    let mut tx = Transaction::pending(
        id,
        Some(BatchId::new(batch)),
        Transfer {
            source_wallet: format!("buyer-{id}"),
            destination_wallet: "escrow".to_string(),
            amount: Amount::new(dec!(10.0)).unwrap(),
        },
    );
    tx.state = state;
    tx
}

/// Fails the given ids, settles everything else, and records call order.
#[derive(Default)]
pub struct ScriptedLedger {
    failing: HashSet<TransactionId>,
    calls: Mutex<Vec<TransactionId>>,
}

impl ScriptedLedger {
    pub fn failing(ids: impl IntoIterator<Item = TransactionId>) -> Self {
        Self {
            failing: ids.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TransactionId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn execute(
        &self,
        tx: &Transaction,
        key: IdempotencyKey,
    ) -> Result<Settlement, LedgerError> {
        self.calls.lock().unwrap().push(tx.id);
        if self.failing.contains(&tx.id) {
            Err(LedgerError::Unavailable("node timed out".to_string()))
        } else {
            Ok(Settlement {
                reference: key.to_string(),
                posted_at: Utc::now(),
            })
        }
    }
}

/// Dies mid-submission for the given ids, the way a process crash would
/// interrupt it. Settles everything else.
pub struct CrashingLedger {
    crashing: HashSet<TransactionId>,
}

impl CrashingLedger {
    pub fn on(ids: impl IntoIterator<Item = TransactionId>) -> Self {
        Self {
            crashing: ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl LedgerClient for CrashingLedger {
    async fn execute(
        &self,
        tx: &Transaction,
        key: IdempotencyKey,
    ) -> Result<Settlement, LedgerError> {
        if self.crashing.contains(&tx.id) {
            panic!("process killed during ledger submission of tx {}", tx.id);
        }
        Ok(Settlement {
            reference: key.to_string(),
            posted_at: Utc::now(),
        })
    }
}

pub fn generate_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["id", "batch", "source", "destination", "amount"])?;

    for i in 1..=rows {
        wtr.write_record([
            i.to_string().as_str(),
            &format!("batch-{}", i % 10),
            &format!("buyer-{i}"),
            "escrow",
            "1.0",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
