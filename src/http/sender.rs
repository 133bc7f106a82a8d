use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::RequestOutcome;

/// Header carrying the `run.user.call` trace tag.
pub const ID_HEADER: &str = "id";

/// Issues one request and reports what happened.
///
/// Implementations are shared by every lane of a run and must tolerate
/// concurrent calls.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, url: &str, id_tag: &str) -> RequestOutcome;
}

#[derive(Debug, Clone, Copy)]
pub struct SenderSettings {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_connections: usize,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            write_timeout: Duration::from_millis(500),
            max_connections: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    /// Builds the pooled client shared by all lanes of a run.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(settings: SenderSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.read_timeout.saturating_add(settings.write_timeout))
            .connect_timeout(settings.write_timeout)
            .pool_max_idle_per_host(settings.max_connections)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestSender for ReqwestSender {
    async fn send(&self, url: &str, id_tag: &str) -> RequestOutcome {
        let response = match self.client.get(url).header(ID_HEADER, id_tag).send().await {
            Ok(response) => response,
            Err(err) => return RequestOutcome::transport_failure(failure_reason(&err)),
        };
        let status = response.status().as_u16();
        match drain_response_body(response).await {
            Ok(_) => RequestOutcome::status(status),
            Err(err) => RequestOutcome::transport_failure(failure_reason(&err)),
        }
    }
}

async fn drain_response_body(response: reqwest::Response) -> Result<u64, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        total_bytes = total_bytes.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    }
    Ok(total_bytes)
}

/// Reason text used as the error tally key. Timeouts collapse to one key;
/// everything else uses the innermost cause so the URL does not split
/// otherwise identical failures.
fn failure_reason(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "timeout".to_owned();
    }
    let mut cause: &dyn std::error::Error = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}
