use super::test_support::{PlaceholderSender, RecordingSender, StaticStatusSender, lane_of};
use super::*;
use crate::error::{AppError, AppResult};
use crate::metrics::{OUTCOME_CHANNEL_CAPACITY, RequestOutcome, StatusClass, spawn_aggregator};
use crate::workload::DispatchPlan;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

#[test]
fn request_id_uses_run_user_call_layout() -> AppResult<()> {
    let id = request_id("RID007", 12, 345);
    if id != "RID007.UID00012.CID000345" {
        return Err(AppError::validation(format!("Unexpected id tag: {}", id)));
    }
    if lane_of(&id) != Some(12) {
        return Err(AppError::validation("lane could not be parsed back"));
    }
    Ok(())
}

#[test]
fn dispatch_numbers_lanes_from_plan_offset() -> AppResult<()> {
    run_async_test(async {
        let plan = DispatchPlan::new(6, 3)?.starting_at(3);
        let sender = Arc::new(RecordingSender::default());
        let (outcome_tx, mut outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);

        dispatch(
            &plan,
            "RID001",
            "http://unused.invalid/",
            sender.clone(),
            outcome_tx,
        )
        .await?;
        while outcome_rx.recv().await.is_some() {}

        let lanes: BTreeSet<usize> = sender
            .ids()
            .iter()
            .filter_map(|id| lane_of(id.as_str()))
            .collect();
        if lanes != BTreeSet::from([3, 4, 5]) {
            return Err(AppError::validation(format!(
                "Unexpected lanes: {:?}",
                lanes
            )));
        }
        Ok(())
    })
}

#[test]
fn dispatch_issues_each_lane_quota_with_unique_ids() -> AppResult<()> {
    run_async_test(async {
        let plan = DispatchPlan::new(11, 4)?;
        let sender = Arc::new(RecordingSender::default());
        let (outcome_tx, mut outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);

        let issued = dispatch(
            &plan,
            "RID001",
            "http://unused.invalid/",
            sender.clone(),
            outcome_tx,
        )
        .await?;

        let mut received = 0u64;
        while outcome_rx.recv().await.is_some() {
            received = received.saturating_add(1);
        }
        if issued != 11 || received != 11 {
            return Err(AppError::validation(format!(
                "issued {} received {}",
                issued, received
            )));
        }

        let ids = sender.ids();
        let unique: BTreeSet<&String> = ids.iter().collect();
        if unique.len() != ids.len() {
            return Err(AppError::validation("duplicate id tags were sent"));
        }
        let lane_zero = ids
            .iter()
            .filter(|id| lane_of(id.as_str()) == Some(0))
            .count();
        if lane_zero != 5 {
            return Err(AppError::validation(format!(
                "lane 0 sent {} requests, expected 5",
                lane_zero
            )));
        }
        Ok(())
    })
}

#[test]
fn dispatch_closes_channel_when_lanes_finish() -> AppResult<()> {
    run_async_test(async {
        let plan = DispatchPlan::new(30, 3)?;
        let sender = Arc::new(StaticStatusSender::new(200));
        let (outcome_tx, outcome_rx) = mpsc::channel(2);
        let aggregator = spawn_aggregator(outcome_rx, None, None);

        dispatch(&plan, "RID002", "http://unused.invalid/", sender.clone(), outcome_tx).await?;
        let aggregate = tokio::time::timeout(Duration::from_secs(5), aggregator)
            .await
            .map_err(|err| AppError::validation(format!("aggregator hung: {}", err)))??;

        if aggregate.histogram.count(StatusClass::Success) != 30 || sender.calls() != 30 {
            return Err(AppError::validation(format!(
                "Unexpected histogram {:?} after {} calls",
                aggregate.histogram.counts(),
                sender.calls()
            )));
        }
        Ok(())
    })
}

#[test]
fn dispatch_replaces_placeholder_outcomes_with_failures() -> AppResult<()> {
    run_async_test(async {
        let plan = DispatchPlan::new(4, 2)?;
        let (outcome_tx, mut outcome_rx) = mpsc::channel(8);
        dispatch(
            &plan,
            "RID003",
            "http://unused.invalid/",
            Arc::new(PlaceholderSender),
            outcome_tx,
        )
        .await?;

        while let Some(outcome) = outcome_rx.recv().await {
            if outcome != RequestOutcome::transport_failure("empty response") {
                return Err(AppError::validation(format!(
                    "Unexpected outcome: {:?}",
                    outcome
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn dispatch_lanes_stop_when_aggregator_is_gone() -> AppResult<()> {
    run_async_test(async {
        let plan = DispatchPlan::new(100, 2)?;
        let (outcome_tx, outcome_rx) = mpsc::channel(1);
        drop(outcome_rx);
        let issued = dispatch(
            &plan,
            "RID004",
            "http://unused.invalid/",
            Arc::new(StaticStatusSender::new(200)),
            outcome_tx,
        )
        .await?;
        if issued != 0 {
            return Err(AppError::validation(format!(
                "lanes kept counting after channel closed: {}",
                issued
            )));
        }
        Ok(())
    })
}

async fn spawn_status_server(status_line: &'static str) -> AppResult<(String, mpsc::Receiver<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (request_tx, request_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let request_tx = request_tx.clone();
            tokio::spawn(async move {
                let mut buffer = [0u8; 2048];
                let Ok(read) = socket.read(&mut buffer).await else {
                    return;
                };
                let head = String::from_utf8_lossy(buffer.get(..read).unwrap_or(&[])).into_owned();
                drop(request_tx.send(head).await);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK",
                    status_line
                );
                if socket.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
                let _shutdown_result = socket.shutdown().await;
            });
        }
    });
    Ok((format!("http://{}/", addr), request_rx))
}

#[test]
fn reqwest_sender_reports_status_and_sets_id_header() -> AppResult<()> {
    run_async_test(async {
        let (url, mut requests) = match spawn_status_server("503 Service Unavailable").await {
            Ok(server) => server,
            Err(err) if err.to_string().contains("Operation not permitted") => {
                eprintln!("Skipping sender test: {}", err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let sender = ReqwestSender::new(SenderSettings {
            read_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            max_connections: 4,
        })?;

        let outcome = sender.send(&url, "RID009.UID00000.CID000000").await;
        if outcome != RequestOutcome::status(503) {
            return Err(AppError::validation(format!(
                "Unexpected outcome: {:?}",
                outcome
            )));
        }
        let head = requests
            .recv()
            .await
            .ok_or_else(|| AppError::validation("server saw no request"))?
            .to_ascii_lowercase();
        if !head.contains("id: rid009.uid00000.cid000000") {
            return Err(AppError::validation(format!(
                "id header missing from request: {}",
                head
            )));
        }
        Ok(())
    })
}

#[test]
fn reqwest_sender_turns_refused_connection_into_failure() -> AppResult<()> {
    run_async_test(async {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
            listener.local_addr()?.port()
        };
        let sender = ReqwestSender::new(SenderSettings::default())?;
        let outcome = sender
            .send(&format!("http://127.0.0.1:{}/", port), "RID010.UID00000.CID000000")
            .await;
        if outcome.status_code != 0 || outcome.failure_reason.is_empty() {
            return Err(AppError::validation(format!(
                "Expected transport failure, got {:?}",
                outcome
            )));
        }
        Ok(())
    })
}
