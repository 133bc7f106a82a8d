use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Dispatch lane {lane} failed: {source}")]
    LaneFailed {
        lane: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}
