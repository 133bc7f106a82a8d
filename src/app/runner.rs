use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::progress::ProgressBar;
use crate::domain::RunConfiguration;
use crate::error::{AppError, AppResult};
use crate::http::{RequestSender, dispatch};
use crate::metrics::{OUTCOME_CHANNEL_CAPACITY, RequestOutcome, RunReport, spawn_aggregator};
use crate::workload::DispatchPlan;

/// Executes one run in this process: plan lanes, start the aggregator,
/// dispatch, and wait for both before building the report.
///
/// `tap` receives a copy of every counted outcome; agents use it to batch
/// stats for the coordinator.
///
/// # Errors
///
/// Returns an error when the concurrency is invalid (before any request is
/// sent) or when a lane task panics.
pub async fn run_local(
    config: &RunConfiguration,
    sender: Arc<dyn RequestSender>,
    tap: Option<mpsc::UnboundedSender<RequestOutcome>>,
) -> AppResult<RunReport> {
    let plan = DispatchPlan::new(config.total_requests, config.concurrency)
        .map_err(AppError::validation)?
        .starting_at(config.first_lane);
    if config.rate_limit.is_some() {
        warn!("Rate limit is configured but not enforced; requests are sent back-to-back.");
    }

    info!(
        "Run {} starting: {} requests across {} lanes against {}",
        config.run_id,
        plan.total_requests(),
        plan.lane_count(),
        config.target_url
    );

    let progress = ProgressBar::start(plan.total_requests(), config.progress);
    let (outcome_tx, outcome_rx) = mpsc::channel::<RequestOutcome>(OUTCOME_CHANNEL_CAPACITY);
    let aggregator = spawn_aggregator(
        outcome_rx,
        tap,
        progress.as_ref().map(ProgressBar::counter),
    );
    let dispatched = dispatch(&plan, &config.run_id, &config.target_url, sender, outcome_tx).await;
    let aggregated = aggregator.await;
    if let Some(progress) = progress {
        progress.finish().await;
    }
    let aggregate = aggregated?;
    let issued = dispatched?;

    if issued != plan.total_requests() {
        warn!(
            "Run {} issued {} of {} planned requests",
            config.run_id,
            issued,
            plan.total_requests()
        );
    }
    info!(
        "Run {} finished: {} outcomes aggregated",
        config.run_id, aggregate.received
    );
    Ok(aggregate.into_report(config.run_id.clone()))
}
