use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributedError {
    #[error("Cannot run a distributed test with fewer than 2 expected agents (got {expected}).")]
    InsufficientAgents { expected: usize },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection error to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection closed.")]
    ConnectionClosed,
    #[error("Wire message exceeded max size ({max_bytes} bytes).")]
    WireMessageTooLarge { max_bytes: usize },
    #[error("Wire message was not valid UTF-8: {source}")]
    WireMessageInvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Serialization error during {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Deserialization error during {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Expected register from agent.")]
    ExpectedRegister,
    #[error("Timed out waiting for agent register.")]
    RegisterTimeout,
    #[error("Unexpected message from coordinator.")]
    UnexpectedMessageFromCoordinator,
    #[error("Unexpected message from agent {agent_id}.")]
    UnexpectedMessageFromAgent { agent_id: u64 },
    #[error("Stats batch carried agent id {actual}, connection is registered as {expected}.")]
    AgentIdMismatch { expected: u64, actual: u64 },
    #[error("Stats batch of {len} outcomes exceeds the limit of {max}.")]
    BatchTooLarge { len: usize, max: usize },
    #[error("Coordinator rejected stats batch (status {status}).")]
    StatsRejected { status: i32 },
    #[error("Coordinator accepted an agent assignment with zero concurrency.")]
    EmptyAssignment,
    #[error("Remote error: {message}")]
    Remote { message: String },
}
