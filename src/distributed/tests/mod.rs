use std::future::Future;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use super::protocol::{WireMessage, read_message, send_message};
use crate::domain::{ProgressSettings, RunConfiguration, RunMode};
use crate::error::{AppError, AppResult};


const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

fn run_config(
    mode: RunMode,
    coordinator_addr: &str,
    total_requests: u64,
    concurrency: usize,
    expected_agents: usize,
) -> RunConfiguration {
    RunConfiguration {
        name: "distributed".to_owned(),
        run_id: "RID001".to_owned(),
        target_url: "http://unused.invalid/".to_owned(),
        total_requests,
        concurrency,
        mode,
        expected_agents,
        coordinator_addr: coordinator_addr.to_owned(),
        rate_limit: None,
        first_lane: 0,
        progress: ProgressSettings::default(),
    }
}

async fn settle<T, F>(future: F) -> AppResult<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, future)
        .await
        .map_err(|_err| AppError::validation("Timed out waiting for distributed run"))
}

async fn within<T, F>(future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    settle(future).await?
}

/// Raw protocol client used to drive the coordinator by hand.
struct WireClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl WireClient {
    async fn connect(addr: &str) -> AppResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    async fn send(&mut self, message: &WireMessage) -> AppResult<()> {
        send_message(&mut self.writer, message).await
    }

    async fn recv(&mut self) -> AppResult<WireMessage> {
        within(read_message(&mut self.reader)).await
    }
}

/// Accepts one connection and hands it to `script`, playing coordinator.
async fn scripted_coordinator<F, Fut>(
    script: F,
) -> AppResult<(String, tokio::task::JoinHandle<AppResult<()>>)>
where
    F: FnOnce(WireClient) -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let (read_half, writer) = stream.into_split();
        script(WireClient {
            reader: BufReader::new(read_half),
            writer,
        })
        .await
    });
    Ok((addr, handle))
}
