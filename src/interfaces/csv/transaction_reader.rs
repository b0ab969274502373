use crate::domain::transaction::{Amount, BatchId, Transaction, TransactionState, Transfer};
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::io::Read;

/// One input row: `id, batch, source, destination, amount[, state]`.
#[derive(Debug, Deserialize)]
struct TransactionRow {
    id: u64,
    #[serde(default)]
    batch: Option<String>,
    source: String,
    destination: String,
    amount: Amount,
    #[serde(default)]
    state: Option<TransactionState>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        let batch_id = row.batch.filter(|b| !b.is_empty()).map(BatchId);
        let mut tx = Transaction::pending(
            row.id,
            batch_id,
            Transfer {
                source_wallet: row.source,
                destination_wallet: row.destination,
                amount: row.amount,
            },
        );
        if let Some(state) = row.state {
            tx.state = state;
        }
        tx
    }
}

/// Reads transactions to enqueue from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Transaction>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes transactions.
    pub fn transactions(self) -> impl Iterator<Item = Result<Transaction>> {
        self.reader
            .into_deserialize::<TransactionRow>()
            .map(|result| result.map(Transaction::from).map_err(EngineError::from))
    }
}
