use crate::domain::ports::{IdempotencyKey, LedgerClient};
use crate::domain::transaction::{Settlement, Transaction};
use crate::error::LedgerError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// An in-process stand-in for the ledger network.
///
/// Settles each idempotency key once; a repeated key gets the original
/// settlement back instead of a second posting. Self-transfers are rejected.
#[derive(Default, Clone)]
pub struct SimulatedLedger {
    settled: Arc<Mutex<HashMap<IdempotencyKey, Settlement>>>,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct postings made so far.
    pub async fn postings(&self) -> usize {
        self.settled.lock().await.len()
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn execute(
        &self,
        tx: &Transaction,
        key: IdempotencyKey,
    ) -> Result<Settlement, LedgerError> {
        if tx.transfer.source_wallet == tx.transfer.destination_wallet {
            return Err(LedgerError::Rejected(format!(
                "source and destination wallet are both '{}'",
                tx.transfer.source_wallet
            )));
        }

        let mut settled = self.settled.lock().await;
        if let Some(existing) = settled.get(&key) {
            debug!(key = %key, "replaying settlement for repeated idempotency key");
            return Ok(existing.clone());
        }

        let settlement = Settlement {
            reference: format!("sim-{key}"),
            posted_at: Utc::now(),
        };
        settled.insert(key, settlement.clone());
        Ok(settlement)
    }
}
