use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::{RequestOutcome, StatusClass, classify};
use crate::workload::DispatchPlan;

use super::sender::RequestSender;

/// Trace tag sent with every request: `<run>.UID<lane>.CID<call>`.
#[must_use]
pub fn request_id(run_id: &str, lane: usize, call: u64) -> String {
    format!("{}.UID{:05}.CID{:06}", run_id, lane, call)
}

struct Lane {
    index: usize,
    quota: u64,
    run_id: Arc<str>,
    target_url: Arc<str>,
    sender: Arc<dyn RequestSender>,
    outcome_tx: mpsc::Sender<RequestOutcome>,
}

/// Runs one task per plan entry and waits until every lane has issued its
/// quota. Lane ids in the request tags start at
/// [`DispatchPlan::first_lane`]. `outcome_tx` is consumed; once the last lane
/// ends, the outcome channel closes.
///
/// # Errors
///
/// Returns an error if a lane task panicked. The remaining lanes still run
/// to completion first.
pub async fn dispatch(
    plan: &DispatchPlan,
    run_id: &str,
    target_url: &str,
    sender: Arc<dyn RequestSender>,
    outcome_tx: mpsc::Sender<RequestOutcome>,
) -> AppResult<u64> {
    let run_id: Arc<str> = Arc::from(run_id);
    let target_url: Arc<str> = Arc::from(target_url);

    let mut handles = Vec::with_capacity(plan.lane_count());
    for (offset, quota) in plan.lanes().iter().copied().enumerate() {
        let lane = Lane {
            index: plan.first_lane().saturating_add(offset),
            quota,
            run_id: Arc::clone(&run_id),
            target_url: Arc::clone(&target_url),
            sender: Arc::clone(&sender),
            outcome_tx: outcome_tx.clone(),
        };
        handles.push(tokio::spawn(run_lane(lane)));
    }
    drop(outcome_tx);
    debug!("Dispatched {} lanes for run {}", handles.len(), run_id);

    let mut issued: u64 = 0;
    let mut first_failure: Option<AppError> = None;
    for (lane, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(count) => issued = issued.saturating_add(count),
            Err(err) => {
                warn!("Lane {} of run {} failed: {}", lane, run_id, err);
                if first_failure.is_none() {
                    first_failure = Some(AppError::http(HttpError::LaneFailed { lane, source: err }));
                }
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(issued),
    }
}

async fn run_lane(lane: Lane) -> u64 {
    let mut issued: u64 = 0;
    for call in 0..lane.quota {
        let id_tag = request_id(&lane.run_id, lane.index, call);
        let mut outcome = lane.sender.send(&lane.target_url, &id_tag).await;
        if outcome.is_placeholder() {
            outcome = RequestOutcome::transport_failure("empty response");
        }
        if classify(&outcome) == Some(StatusClass::Unclassified) {
            debug!(
                "Request {} unclassified (status {}): {}",
                id_tag, outcome.status_code, outcome.failure_reason
            );
        }
        if lane.outcome_tx.send(outcome).await.is_err() {
            warn!(
                "Outcome channel closed; lane {} stopping after {} of {} requests",
                lane.index, issued, lane.quota
            );
            break;
        }
        issued = issued.saturating_add(1);
    }
    issued
}
