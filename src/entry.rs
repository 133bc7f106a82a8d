use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app::{ReportContext, emit_report, render_report, run_local};
use crate::args::TesterArgs;
use crate::config::{BatchPlan, load_batch, plan_runs};
use crate::distributed::{run_agent, run_coordinator};
use crate::domain::{RunConfiguration, RunMode};
use crate::error::{AppError, AppResult};
use crate::http::{ReqwestSender, SenderSettings};
use crate::metrics::RunReport;
use crate::shutdown::shutdown_requested;

const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub(crate) fn run() -> AppResult<()> {
    let args = TesterArgs::parse();

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run_async(args));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

async fn run_async(args: TesterArgs) -> AppResult<()> {
    let batch = load_batch(args.file.as_deref())?;
    let plan = plan_runs(&args, batch)?;
    let settings = sender_settings(&args);

    let (shutdown_rx, signal_handle) = crate::shutdown::signal_shutdown();
    let result = execute_plan(&plan, settings, &shutdown_rx).await;
    signal_handle.abort();
    result
}

fn sender_settings(args: &TesterArgs) -> SenderSettings {
    SenderSettings {
        read_timeout: Duration::from_millis(args.read_timeout_ms.get()),
        write_timeout: Duration::from_millis(args.write_timeout_ms.get()),
        max_connections: args.max_connections.get(),
    }
}

async fn execute_plan(
    plan: &BatchPlan,
    settings: SenderSettings,
    shutdown: &watch::Receiver<bool>,
) -> AppResult<()> {
    for run in &plan.runs {
        info!(
            "Test \"{}\" running - Run: {} ({})",
            plan.name,
            run.run_id,
            run.mode.as_str()
        );
        match run.mode {
            RunMode::Local => {
                let sender = Arc::new(ReqwestSender::new(settings)?);
                let report =
                    until_shutdown(run, shutdown, run_local(run, sender, None)).await?;
                publish(plan, run, &report).await?;
            }
            RunMode::Coordinator => {
                let report = run_coordinator(run, Some(shutdown.clone())).await?;
                publish(plan, run, &report).await?;
            }
            RunMode::Agent => {
                let sender = Arc::new(ReqwestSender::new(settings)?);
                let report = until_shutdown(run, shutdown, run_agent(run, sender)).await?;
                info!(
                    "Agent share of run {} done: {} requests sent",
                    report.run_id, report.total_attempted
                );
            }
        }
    }
    Ok(())
}

/// Local and agent runs stop on the first shutdown signal; the coordinator
/// watches the flag itself so it can still merge what arrived.
async fn until_shutdown<F>(
    run: &RunConfiguration,
    shutdown: &watch::Receiver<bool>,
    work: F,
) -> AppResult<RunReport>
where
    F: Future<Output = AppResult<RunReport>>,
{
    tokio::select! {
        report = work => report,
        () = shutdown_requested(shutdown.clone()) => {
            warn!("Run {} stopped before completion", run.run_id);
            Err(AppError::Interrupted {
                run_id: run.run_id.clone(),
            })
        }
    }
}

async fn publish(plan: &BatchPlan, run: &RunConfiguration, report: &RunReport) -> AppResult<()> {
    let context = ReportContext {
        name: &plan.name,
        target_requests: run.total_requests,
        concurrency: run.concurrency,
    };
    let rendered = render_report(report, &context, plan.format);
    emit_report(&rendered, plan.output.as_deref()).await
}
