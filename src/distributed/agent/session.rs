use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, DistributedError};
use crate::metrics::RequestOutcome;

use super::super::protocol::{
    ACK_ACCEPTED, AssignmentMessage, RegisterMessage, StatsMessage, WireMessage, read_message,
    send_message,
};

/// An agent's registered connection to its coordinator.
pub(super) struct AgentSession {
    pub(super) assignment: AssignmentMessage,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl AgentSession {
    /// Connects, registers for `run_id`, and waits for the assignment.
    pub(super) async fn register(addr: &str, run_id: &str) -> AppResult<Self> {
        info!("Connecting to coordinator {}", addr);
        let stream = TcpStream::connect(addr).await.map_err(|err| {
            AppError::distributed(DistributedError::Connection {
                addr: addr.to_owned(),
                source: err,
            })
        })?;
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        send_message(
            &mut writer,
            &WireMessage::Register(RegisterMessage {
                run_id: run_id.to_owned(),
            }),
        )
        .await?;
        debug!("Sent register for run {}", run_id);

        let assignment = match read_message(&mut reader).await? {
            WireMessage::Assignment(message) => message,
            WireMessage::Error(message) => {
                return Err(AppError::distributed(DistributedError::Remote {
                    message: message.message,
                }));
            }
            WireMessage::Register(_) | WireMessage::SubmitStats(_) | WireMessage::Ack(_) => {
                return Err(AppError::distributed(
                    DistributedError::UnexpectedMessageFromCoordinator,
                ));
            }
        };
        info!(
            "Registered as agent {}: {} requests, concurrency {}",
            assignment.agent_id, assignment.request_share, assignment.concurrency_share
        );
        Ok(Self {
            assignment,
            reader,
            writer,
        })
    }

    /// Sends one stats batch and waits for its acknowledgement.
    pub(super) async fn submit(
        &mut self,
        outcomes: Vec<RequestOutcome>,
        final_batch: bool,
    ) -> AppResult<()> {
        let count = outcomes.len();
        let message = WireMessage::SubmitStats(StatsMessage {
            agent_id: self.assignment.agent_id,
            outcomes: outcomes.into_iter().map(Into::into).collect(),
            final_batch,
        });
        send_message(&mut self.writer, &message).await?;

        match read_message(&mut self.reader).await? {
            WireMessage::Ack(ack) if ack.status == ACK_ACCEPTED => {
                debug!(
                    "Coordinator accepted {} outcomes (final={})",
                    count, final_batch
                );
                Ok(())
            }
            WireMessage::Ack(ack) => Err(AppError::distributed(DistributedError::StatsRejected {
                status: ack.status,
            })),
            WireMessage::Error(message) => Err(AppError::distributed(DistributedError::Remote {
                message: message.message,
            })),
            WireMessage::Register(_) | WireMessage::Assignment(_) | WireMessage::SubmitStats(_) => {
                Err(AppError::distributed(
                    DistributedError::UnexpectedMessageFromCoordinator,
                ))
            }
        }
    }
}
