use super::principal::SessionId;
use super::transaction::{BatchId, Transaction};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

pub type WorkId = u64;

pub const ACTION_PROCESS_BACKLOG: &str = "processBacklog";
pub const ACTION_PROCESS_TRANSACTIONS: &str = "processTransactions";

/// Payload of a request to execute a batch or an explicit list of transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTransactions {
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    #[serde(default)]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl ProcessTransactions {
    pub fn batch(batch_id: BatchId) -> Self {
        Self {
            batch_id: Some(batch_id),
            ..Self::default()
        }
    }

    pub fn transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions: Some(transactions),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBacklog {
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// The closed set of work a worker knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    /// Query the store for interrupted and pending transactions and execute them.
    ProcessBacklog(ProcessBacklog),
    ProcessTransactions(ProcessTransactions),
}

impl WorkItem {
    pub fn action(&self) -> &'static str {
        match self {
            Self::ProcessBacklog(_) => ACTION_PROCESS_BACKLOG,
            Self::ProcessTransactions(_) => ACTION_PROCESS_TRANSACTIONS,
        }
    }

    /// Decodes an action name and its JSON payload into a typed work item.
    pub fn from_action(action: &str, payload: serde_json::Value) -> Result<Self> {
        let invalid = |source: serde_json::Error| EngineError::InvalidPayload {
            action: action.to_string(),
            source,
        };
        match action {
            ACTION_PROCESS_BACKLOG => serde_json::from_value(payload)
                .map(Self::ProcessBacklog)
                .map_err(invalid),
            ACTION_PROCESS_TRANSACTIONS => serde_json::from_value(payload)
                .map(Self::ProcessTransactions)
                .map_err(invalid),
            other => Err(EngineError::UnknownAction(other.to_string())),
        }
    }
}

/// What a caller hands to the worker pool. Raw actions are decoded by the worker.
#[derive(Debug, Clone)]
pub enum Job {
    Item(WorkItem),
    Action {
        action: String,
        payload: serde_json::Value,
    },
}

impl From<WorkItem> for Job {
    fn from(item: WorkItem) -> Self {
        Self::Item(item)
    }
}

/// Result of a successfully handled work item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub batch_id: Option<BatchId>,
    /// Every visited transaction in its final observed form, in processing order.
    pub transactions: Vec<Transaction>,
}
