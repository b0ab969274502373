use crate::domain::ports::{TransactionFilter, TransactionStore};
use crate::domain::transaction::{Transaction, TransactionState};
use crate::error::Result;
use std::collections::HashSet;
use tracing::info;

/// Collects the transactions a previous run left behind.
///
/// `Active` ones come first: their ledger outcome is unknown and they are
/// re-attempted. `Pending` ones were never attempted. A transaction appearing
/// in both result sets (it moved between the two queries) is kept once.
pub async fn load_backlog(store: &dyn TransactionStore) -> Result<Vec<Transaction>> {
    let interrupted = store
        .query(TransactionFilter::by_state(TransactionState::Active))
        .await?;
    let pending = store
        .query(TransactionFilter::by_state(TransactionState::Pending))
        .await?;

    info!(
        interrupted = interrupted.len(),
        pending = pending.len(),
        "loaded transaction backlog"
    );

    let mut seen = HashSet::with_capacity(interrupted.len() + pending.len());
    Ok(interrupted
        .into_iter()
        .chain(pending)
        .filter(|tx| seen.insert(tx.id))
        .collect())
}
