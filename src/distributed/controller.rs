mod connection;
mod state;


use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::ProgressBar;
use crate::domain::{ProgressSettings, RunConfiguration};
use crate::error::{AppError, AppResult, DistributedError};
use crate::metrics::{OUTCOME_CHANNEL_CAPACITY, RequestOutcome, RunReport, spawn_aggregator};
use crate::workload::AgentShare;

use connection::{ConnectionContext, serve_agent};
use state::{AgentEvent, Phase, PhaseTracker, Roster};

/// Coordinator of one distributed run, bound and ready to accept agents.
pub struct Coordinator {
    listener: TcpListener,
    run_id: String,
    share: AgentShare,
    expected_agents: usize,
    total_requests: u64,
    progress: ProgressSettings,
}

impl Coordinator {
    /// Validates the agent count, computes the per-agent share, and binds the
    /// listener at `config.coordinator_addr`.
    ///
    /// # Errors
    ///
    /// Returns [`DistributedError::InsufficientAgents`] before binding when
    /// fewer than 2 agents are expected, or a bind error.
    pub async fn bind(config: &RunConfiguration) -> AppResult<Self> {
        let concurrency = u64::try_from(config.concurrency).unwrap_or(u64::MAX);
        let share = AgentShare::split(config.total_requests, concurrency, config.expected_agents)
            .map_err(AppError::distributed)?;

        let listener = TcpListener::bind(&config.coordinator_addr)
            .await
            .map_err(|err| {
                AppError::distributed(DistributedError::Bind {
                    addr: config.coordinator_addr.clone(),
                    source: err,
                })
            })?;
        info!(
            "Coordinator for run {} listening on {} (expecting {} agents, {} requests / concurrency {} each)",
            config.run_id,
            config.coordinator_addr,
            config.expected_agents,
            share.requests,
            share.concurrency
        );
        Ok(Self {
            listener,
            run_id: config.run_id.clone(),
            share,
            expected_agents: config.expected_agents,
            total_requests: config.total_requests,
            progress: config.progress,
        })
    }

    /// # Errors
    ///
    /// Returns an error when the bound address cannot be read.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        self.listener.local_addr().map_err(|err| {
            AppError::distributed(DistributedError::Io {
                context: "read coordinator address",
                source: err,
            })
        })
    }

    #[must_use]
    pub const fn share(&self) -> AgentShare {
        self.share
    }

    /// Accepts agents and merges their stats until enough agents finished
    /// and none is still streaming, or until `shutdown` turns true.
    ///
    /// # Errors
    ///
    /// Returns an error only if the aggregator task fails. Agent failures are
    /// logged and end that agent's connection.
    pub async fn run(self, shutdown: Option<watch::Receiver<bool>>) -> AppResult<RunReport> {
        let Coordinator {
            listener,
            run_id,
            share,
            expected_agents,
            total_requests,
            progress,
        } = self;
        let mut phase = PhaseTracker::new(run_id.clone());
        phase.advance(Phase::AwaitingRegistrations);

        let (outcome_tx, outcome_rx) = mpsc::channel::<RequestOutcome>(OUTCOME_CHANNEL_CAPACITY);
        let expected = u64::try_from(expected_agents).unwrap_or(u64::MAX);
        let progress = ProgressBar::start(share.requests.saturating_mul(expected), progress);
        let aggregator = spawn_aggregator(
            outcome_rx,
            None,
            progress.as_ref().map(ProgressBar::counter),
        );
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AgentEvent>();
        let context = ConnectionContext {
            run_id: Arc::from(run_id.as_str()),
            share,
            next_agent_id: Arc::new(AtomicU64::new(0)),
            outcome_tx,
            event_tx,
        };

        let mut handlers: Vec<JoinHandle<()>> = Vec::new();
        let mut roster = Roster::new(expected_agents);
        let mut shutdown = shutdown;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("Agent connection from {}", peer);
                        handlers.push(tokio::spawn(serve_agent(
                            stream,
                            peer.to_string(),
                            context.clone(),
                        )));
                    }
                    Err(err) => warn!("Failed to accept agent connection: {}", err),
                },
                Some(event) = event_rx.recv() => {
                    roster.apply(&event);
                    match event {
                        AgentEvent::BatchReceived { agent_id, outcomes } => {
                            debug!("Agent {} delivered {} outcomes", agent_id, outcomes);
                            phase.advance(Phase::Running);
                        }
                        AgentEvent::Finished { agent_id } => info!(
                            "Agent {} finished ({} of {} expected)",
                            agent_id,
                            roster.finished(),
                            expected_agents
                        ),
                        AgentEvent::Dropped { agent_id: Some(agent_id), reason } => warn!(
                            "Agent {} lost ({}); {} agents still active",
                            agent_id,
                            reason,
                            roster.active()
                        ),
                        AgentEvent::Registered { .. } | AgentEvent::Dropped { agent_id: None, .. } => {}
                    }
                    if roster.is_complete() {
                        break;
                    }
                }
                () = wait_for_shutdown(&mut shutdown) => {
                    warn!(
                        "Shutdown requested; merging stats from {} of {} registered agents",
                        roster.finished(),
                        roster.registered()
                    );
                    break;
                }
            }
        }

        phase.advance(Phase::Merging);
        drop(listener);
        for handler in &handlers {
            handler.abort();
        }
        for handler in handlers {
            if let Err(err) = handler.await
                && !err.is_cancelled()
            {
                warn!("Agent handler failed: {}", err);
            }
        }
        drop(context);

        let aggregated = aggregator.await;
        if let Some(progress) = progress {
            progress.finish().await;
        }
        let aggregate = aggregated?;
        let finished = u64::try_from(roster.finished()).unwrap_or(u64::MAX);
        let provisioned = share.requests.saturating_mul(finished);
        if aggregate.received != provisioned {
            warn!(
                "Run {} merged {} outcomes, expected {} from {} finished agents",
                run_id, aggregate.received, provisioned, finished
            );
        }
        info!(
            "Run {} merged {} outcomes (target {})",
            run_id, aggregate.received, total_requests
        );
        phase.advance(Phase::Complete);
        debug!("Coordinator for run {} is {}", run_id, phase.current());
        Ok(aggregate.into_report(run_id))
    }
}

/// Binds a coordinator for `config` and runs it to completion.
///
/// # Errors
///
/// Returns an error when the run cannot be coordinated; see
/// [`Coordinator::bind`] and [`Coordinator::run`].
pub async fn run_coordinator(
    config: &RunConfiguration,
    shutdown: Option<watch::Receiver<bool>>,
) -> AppResult<RunReport> {
    Coordinator::bind(config).await?.run(shutdown).await
}

async fn wait_for_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(receiver) = shutdown.as_mut() {
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                break;
            }
        }
    }
    std::future::pending::<()>().await;
}
