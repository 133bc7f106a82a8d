use serde::{Deserialize, Serialize};

use crate::metrics::RequestOutcome;

/// Acknowledgement status for an accepted stats batch.
pub(in crate::distributed) const ACK_ACCEPTED: i32 = 1;

/// Upper bound on outcomes carried by one stats batch.
pub(in crate::distributed) const MAX_BATCH_OUTCOMES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(in crate::distributed) enum WireMessage {
    Register(RegisterMessage),
    Assignment(AssignmentMessage),
    SubmitStats(StatsMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(in crate::distributed) struct RegisterMessage {
    pub(in crate::distributed) run_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(in crate::distributed) struct AssignmentMessage {
    pub(in crate::distributed) agent_id: u64,
    pub(in crate::distributed) request_share: u64,
    pub(in crate::distributed) concurrency_share: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(in crate::distributed) struct StatsMessage {
    pub(in crate::distributed) agent_id: u64,
    pub(in crate::distributed) outcomes: Vec<WireOutcome>,
    /// Set on the last batch an agent sends for the run.
    #[serde(default)]
    pub(in crate::distributed) final_batch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(in crate::distributed) struct WireOutcome {
    pub(in crate::distributed) status: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(in crate::distributed) error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(in crate::distributed) struct AckMessage {
    pub(in crate::distributed) status: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(in crate::distributed) struct ErrorMessage {
    pub(in crate::distributed) message: String,
}

impl From<RequestOutcome> for WireOutcome {
    fn from(outcome: RequestOutcome) -> Self {
        Self {
            status: outcome.status_code,
            error: outcome.failure_reason,
        }
    }
}

impl From<WireOutcome> for RequestOutcome {
    fn from(outcome: WireOutcome) -> Self {
        Self {
            status_code: outcome.status,
            failure_reason: outcome.error,
        }
    }
}
