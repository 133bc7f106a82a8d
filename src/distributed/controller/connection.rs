use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, DistributedError};
use crate::metrics::RequestOutcome;
use crate::workload::AgentShare;

use super::super::protocol::{
    ACK_ACCEPTED, AckMessage, AssignmentMessage, ErrorMessage, MAX_BATCH_OUTCOMES, WireMessage,
    read_message, send_message,
};
use super::state::AgentEvent;

const AGENT_REGISTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared by every connection handler of one coordinator run.
#[derive(Clone)]
pub(super) struct ConnectionContext {
    pub(super) run_id: Arc<str>,
    pub(super) share: AgentShare,
    pub(super) next_agent_id: Arc<AtomicU64>,
    pub(super) outcome_tx: mpsc::Sender<RequestOutcome>,
    pub(super) event_tx: mpsc::UnboundedSender<AgentEvent>,
}

/// Serves one agent connection until its final batch or a failure. Failures
/// end this connection only.
pub(super) async fn serve_agent(stream: TcpStream, peer: String, context: ConnectionContext) {
    let mut agent_id = None;
    let result = handle_agent(stream, &peer, &context, &mut agent_id).await;
    if let Err(err) = result {
        match agent_id {
            Some(id) => warn!("Agent {} ({}) dropped: {}", id, peer, err),
            None => warn!("Connection from {} rejected: {}", peer, err),
        }
        let event = AgentEvent::Dropped {
            agent_id,
            reason: err.to_string(),
        };
        if context.event_tx.send(event).is_err() {
            debug!("Coordinator stopped before drop of {} was recorded", peer);
        }
    }
}

async fn handle_agent(
    stream: TcpStream,
    peer: &str,
    context: &ConnectionContext,
    agent_id: &mut Option<u64>,
) -> AppResult<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let register = match timeout(AGENT_REGISTER_TIMEOUT, read_message(&mut reader)).await {
        Ok(result) => match result? {
            WireMessage::Register(message) => message,
            WireMessage::Error(message) => {
                return Err(AppError::distributed(DistributedError::Remote {
                    message: message.message,
                }));
            }
            WireMessage::Assignment(_)
            | WireMessage::SubmitStats(_)
            | WireMessage::Ack(_) => {
                reject(&mut writer, "Expected register.").await?;
                return Err(AppError::distributed(DistributedError::ExpectedRegister));
            }
        },
        Err(_) => {
            return Err(AppError::distributed(DistributedError::RegisterTimeout));
        }
    };
    if register.run_id != *context.run_id {
        warn!(
            "Agent at {} registered for run {} while coordinating {}",
            peer, register.run_id, context.run_id
        );
    }

    let id = context.next_agent_id.fetch_add(1, Ordering::SeqCst);
    *agent_id = Some(id);
    send_message(
        &mut writer,
        &WireMessage::Assignment(AssignmentMessage {
            agent_id: id,
            request_share: context.share.requests,
            concurrency_share: context.share.concurrency,
        }),
    )
    .await?;
    info!(
        "Agent {} registered from {} ({} requests, concurrency {})",
        id, peer, context.share.requests, context.share.concurrency
    );
    notify(context, AgentEvent::Registered { agent_id: id });

    loop {
        let stats = match read_message(&mut reader).await? {
            WireMessage::SubmitStats(message) => message,
            WireMessage::Error(message) => {
                return Err(AppError::distributed(DistributedError::Remote {
                    message: message.message,
                }));
            }
            WireMessage::Register(_) | WireMessage::Assignment(_) | WireMessage::Ack(_) => {
                reject(&mut writer, "Expected stats batch.").await?;
                return Err(AppError::distributed(
                    DistributedError::UnexpectedMessageFromAgent { agent_id: id },
                ));
            }
        };

        if stats.agent_id != id {
            reject(&mut writer, "Agent id does not match registration.").await?;
            return Err(AppError::distributed(DistributedError::AgentIdMismatch {
                expected: id,
                actual: stats.agent_id,
            }));
        }
        let len = stats.outcomes.len();
        if len > MAX_BATCH_OUTCOMES {
            reject(&mut writer, "Stats batch too large.").await?;
            return Err(AppError::distributed(DistributedError::BatchTooLarge {
                len,
                max: MAX_BATCH_OUTCOMES,
            }));
        }

        for outcome in stats.outcomes {
            if context.outcome_tx.send(outcome.into()).await.is_err() {
                debug!("Aggregator closed; ignoring remaining stats from agent {}", id);
                return Ok(());
            }
        }
        notify(
            context,
            AgentEvent::BatchReceived {
                agent_id: id,
                outcomes: len,
            },
        );
        send_message(
            &mut writer,
            &WireMessage::Ack(AckMessage {
                status: ACK_ACCEPTED,
            }),
        )
        .await?;

        if stats.final_batch {
            notify(context, AgentEvent::Finished { agent_id: id });
            return Ok(());
        }
    }
}

fn notify(context: &ConnectionContext, event: AgentEvent) {
    if context.event_tx.send(event).is_err() {
        debug!("Coordinator loop is gone; agent event discarded");
    }
}

async fn reject(writer: &mut OwnedWriteHalf, message: &str) -> AppResult<()> {
    send_message(
        writer,
        &WireMessage::Error(ErrorMessage {
            message: message.to_owned(),
        }),
    )
    .await
}
