use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::classify::classify;
use super::types::{ErrorTally, Histogram, RequestOutcome, RunReport, StatusClass};

/// Capacity of the lane -> aggregator outcome channel.
pub const OUTCOME_CHANNEL_CAPACITY: usize = 1000;

/// Live count of outcomes the aggregator has counted so far. Readers only
/// observe it; the aggregator task is the single writer.
#[derive(Debug, Clone, Default)]
pub struct OutcomeCounter(Arc<AtomicU64>);

impl OutcomeCounter {
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub received: u64,
    pub histogram: Histogram,
    pub errors: ErrorTally,
}

impl Aggregate {
    pub fn record(&mut self, outcome: &RequestOutcome) -> Option<StatusClass> {
        let class = classify(outcome)?;
        self.received = self.received.saturating_add(1);
        self.histogram.record(class);
        if class == StatusClass::Unclassified && !outcome.failure_reason.is_empty() {
            let count = self
                .errors
                .entry(outcome.failure_reason.clone())
                .or_insert(0);
            *count = count.saturating_add(1);
        }
        Some(class)
    }

    #[must_use]
    pub fn into_report(self, run_id: String) -> RunReport {
        RunReport {
            run_id,
            total_attempted: self.received,
            histogram: self.histogram,
            errors: self.errors,
        }
    }
}

/// Spawns the task that exclusively owns the histogram and error tally.
///
/// The task ends only when every sender of `outcome_rx` has been dropped.
/// When `tap` is set, each counted outcome is also forwarded to it; when
/// `counter` is set, it follows the number of counted outcomes.
#[must_use]
pub fn spawn_aggregator(
    mut outcome_rx: mpsc::Receiver<RequestOutcome>,
    tap: Option<mpsc::UnboundedSender<RequestOutcome>>,
    counter: Option<OutcomeCounter>,
) -> JoinHandle<Aggregate> {
    tokio::spawn(async move {
        let mut aggregate = Aggregate::default();
        let mut tap = tap;
        while let Some(outcome) = outcome_rx.recv().await {
            if aggregate.record(&outcome).is_none() {
                warn!("Dropped placeholder outcome with status 0 and no failure reason.");
                continue;
            }
            if let Some(counter) = counter.as_ref() {
                counter.bump();
            }
            if let Some(sink) = tap.as_ref()
                && sink.send(outcome).is_err()
            {
                debug!("Outcome tap closed; continuing without forwarding.");
                tap = None;
            }
        }
        debug!("Aggregator finished after {} outcomes", aggregate.received);
        aggregate
    })
}
