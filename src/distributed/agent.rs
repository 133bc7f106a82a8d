mod batcher;
mod session;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::app::run_local;
use crate::domain::RunConfiguration;
use crate::error::{AppError, AppResult, DistributedError};
use crate::http::RequestSender;
use crate::metrics::{RequestOutcome, RunReport};

pub(in crate::distributed) use batcher::StatsBatcher;
use session::AgentSession;

/// Registers with the coordinator at `config.coordinator_addr`, runs the
/// assigned share locally, and streams every outcome back in batches.
///
/// Returns this agent's local report once the coordinator acknowledged the
/// final batch.
///
/// # Errors
///
/// Any connection, protocol, or acknowledgement failure is fatal and ends
/// the agent without retrying.
pub async fn run_agent(
    config: &RunConfiguration,
    sender: Arc<dyn RequestSender>,
) -> AppResult<RunReport> {
    let mut session = AgentSession::register(&config.coordinator_addr, &config.run_id).await?;
    let assignment = session.assignment;
    if assignment.concurrency_share == 0 {
        return Err(AppError::distributed(DistributedError::EmptyAssignment));
    }
    let concurrency = usize::try_from(assignment.concurrency_share)
        .map_err(|_err| AppError::distributed(DistributedError::EmptyAssignment))?;
    let first_lane = usize::try_from(
        assignment
            .agent_id
            .saturating_mul(assignment.concurrency_share),
    )
    .unwrap_or(usize::MAX);
    let local = config.with_share(assignment.request_share, concurrency, first_lane);

    let (tap_tx, mut tap_rx) = mpsc::unbounded_channel::<RequestOutcome>();
    let run_handle = tokio::spawn(async move { run_local(&local, sender, Some(tap_tx)).await });

    let mut batcher = StatsBatcher::default();
    let streamed: AppResult<()> = async {
        while let Some(outcome) = tap_rx.recv().await {
            if let Some(batch) = batcher.push(outcome) {
                session.submit(batch, false).await?;
            }
        }
        Ok(())
    }
    .await;
    if let Err(err) = streamed {
        run_handle.abort();
        return Err(err);
    }

    let report = run_handle.await??;
    session.submit(batcher.drain(), true).await?;
    info!(
        "Agent {} delivered {} outcomes for run {}",
        assignment.agent_id,
        batcher.submitted(),
        report.run_id
    );
    Ok(report)
}
