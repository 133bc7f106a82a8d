use std::path::PathBuf;

use tracing::{debug, warn};

use crate::args::{OutputFormat, TesterArgs};
use crate::domain::{ProgressSettings, RunConfiguration, RunMode};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{BatchFile, RunEntry};

/// Ordered runs plus the settings shared by all of them.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub name: String,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub runs: Vec<RunConfiguration>,
}

/// Resolves command-line arguments and an optional batch file into the runs
/// to execute, in order.
///
/// Without a batch file the CLI describes exactly one run. Batch values win
/// over CLI values; per-run `url` and `id` win over both.
///
/// # Errors
///
/// Returns an error for an empty batch, a run with zero concurrency, or a
/// target URL that does not parse.
pub fn plan_runs(args: &TesterArgs, batch: Option<BatchFile>) -> AppResult<BatchPlan> {
    let batch = batch.unwrap_or_else(|| BatchFile {
        runs: vec![RunEntry {
            requests: args.requests,
            concurrency: args.concurrency.get(),
            url: None,
            id: None,
        }],
        ..BatchFile::default()
    });

    if batch.runs.is_empty() {
        return Err(AppError::validation(ValidationError::EmptyBatch));
    }

    let name = batch.name.unwrap_or_else(|| args.name.clone());
    let distributed = batch.distributed.unwrap_or(args.distributed);
    let worker = batch.worker.unwrap_or(args.worker);
    if worker && !distributed {
        warn!("--worker has no effect without --distributed; running locally.");
    }
    let mode = RunMode::from_flags(distributed, worker);
    let base_url = batch.url.unwrap_or_else(|| args.url.clone());
    let output = batch.output.or_else(|| args.output.clone()).map(PathBuf::from);
    let format = batch
        .format
        .or(args.output_format)
        .unwrap_or_else(|| OutputFormat::default_for(output.is_some()));
    let expected_agents = batch.expected_agents.unwrap_or(args.expected_agents);
    let coordinator_addr = batch.coordinator.unwrap_or_else(|| args.coordinator.clone());
    let progress = ProgressSettings {
        enabled: !args.no_progress,
        no_color: args.no_color,
    };

    let mut runs = Vec::with_capacity(batch.runs.len());
    for (position, entry) in batch.runs.into_iter().enumerate() {
        let index = position.saturating_add(1);
        if entry.concurrency == 0 {
            return Err(AppError::config(ConfigError::RunConcurrencyZero { index }));
        }
        let target_url = entry
            .url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| base_url.clone());
        validate_url(&target_url)?;

        let run_id = entry
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| run_id_for(index, args.run.get()));
        debug!(
            "Planned run {} ({}): {} requests, concurrency {}, {}",
            run_id,
            mode.as_str(),
            entry.requests,
            entry.concurrency,
            target_url
        );

        runs.push(RunConfiguration {
            name: name.clone(),
            run_id,
            target_url,
            total_requests: entry.requests,
            concurrency: entry.concurrency,
            mode,
            expected_agents,
            coordinator_addr: coordinator_addr.clone(),
            rate_limit: args.rate,
            first_lane: 0,
            progress,
        });
    }

    Ok(BatchPlan {
        name,
        output,
        format,
        runs,
    })
}

/// `RIDnnn` from the run's 1-based position, unless a run counter other than
/// 1 was given, in which case every run shares that counter.
pub(crate) fn run_id_for(index: usize, run_counter: u64) -> String {
    if run_counter == 1 {
        format!("RID{:03}", index)
    } else {
        format!("RID{:03}", run_counter)
    }
}

fn validate_url(url: &str) -> AppResult<()> {
    if url.is_empty() {
        return Err(AppError::validation(ValidationError::MissingUrl));
    }
    url::Url::parse(url).map_err(|err| {
        AppError::validation(ValidationError::InvalidUrl {
            url: url.to_owned(),
            source: err,
        })
    })?;
    Ok(())
}
