use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::metrics::RequestOutcome;

use super::RequestSender;

/// Always answers with the same status.
pub(crate) struct StaticStatusSender {
    status: u16,
    calls: AtomicU64,
}

impl StaticStatusSender {
    pub(crate) const fn new(status: u16) -> Self {
        Self {
            status,
            calls: AtomicU64::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestSender for StaticStatusSender {
    async fn send(&self, _url: &str, _id_tag: &str) -> RequestOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        RequestOutcome::status(self.status)
    }
}

/// Fails every call issued by one lane and answers 200 otherwise.
pub(crate) struct FailingLaneSender {
    failing_lane: usize,
    reason: &'static str,
}

impl FailingLaneSender {
    pub(crate) const fn new(failing_lane: usize, reason: &'static str) -> Self {
        Self {
            failing_lane,
            reason,
        }
    }
}

#[async_trait]
impl RequestSender for FailingLaneSender {
    async fn send(&self, _url: &str, id_tag: &str) -> RequestOutcome {
        tokio::task::yield_now().await;
        if lane_of(id_tag) == Some(self.failing_lane) {
            RequestOutcome::transport_failure(self.reason)
        } else {
            RequestOutcome::status(200)
        }
    }
}

/// Answers 200 and remembers every id tag it saw.
#[derive(Default)]
pub(crate) struct RecordingSender {
    ids: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub(crate) fn ids(&self) -> Vec<String> {
        self.ids.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RequestSender for RecordingSender {
    async fn send(&self, _url: &str, id_tag: &str) -> RequestOutcome {
        if let Ok(mut ids) = self.ids.lock() {
            ids.push(id_tag.to_owned());
        }
        RequestOutcome::status(200)
    }
}

/// Returns the zero-status placeholder, which callers must never count.
pub(crate) struct PlaceholderSender;

#[async_trait]
impl RequestSender for PlaceholderSender {
    async fn send(&self, _url: &str, _id_tag: &str) -> RequestOutcome {
        RequestOutcome::status(0)
    }
}

pub(crate) fn lane_of(id_tag: &str) -> Option<usize> {
    id_tag
        .split('.')
        .find_map(|part| part.strip_prefix("UID"))
        .and_then(|value| value.parse::<usize>().ok())
}
