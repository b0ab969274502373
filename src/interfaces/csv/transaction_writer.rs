use crate::domain::transaction::{Transaction, TransactionState};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct TransactionReport<'a> {
    id: u64,
    batch: Option<&'a str>,
    state: TransactionState,
    posting_date: Option<String>,
    reference: Option<&'a str>,
}

impl<'a> From<&'a Transaction> for TransactionReport<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id,
            batch: tx.batch_id.as_ref().map(|b| b.as_str()),
            state: tx.state,
            posting_date: tx.posting_date.map(|date| date.to_rfc3339()),
            reference: tx.ledger_reference.as_deref(),
        }
    }
}

/// Writes the final state of transactions as CSV
/// (`id,batch,state,posting_date,reference`).
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions<'a>(
        &mut self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<()> {
        for tx in transactions {
            self.writer.serialize(TransactionReport::from(tx))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
