use crate::metrics::RequestOutcome;

use super::super::protocol::MAX_BATCH_OUTCOMES;

/// Buffers tapped outcomes into stats batches of at most
/// [`MAX_BATCH_OUTCOMES`].
#[derive(Debug, Default)]
pub(in crate::distributed) struct StatsBatcher {
    buffer: Vec<RequestOutcome>,
    submitted: u64,
}

impl StatsBatcher {
    /// Adds an outcome; returns a full batch once the buffer holds
    /// [`MAX_BATCH_OUTCOMES`] outcomes.
    pub(in crate::distributed) fn push(
        &mut self,
        outcome: RequestOutcome,
    ) -> Option<Vec<RequestOutcome>> {
        self.buffer.push(outcome);
        if self.buffer.len() >= MAX_BATCH_OUTCOMES {
            return Some(self.take());
        }
        None
    }

    /// Whatever is buffered, possibly nothing.
    pub(in crate::distributed) fn drain(&mut self) -> Vec<RequestOutcome> {
        self.take()
    }

    pub(in crate::distributed) const fn submitted(&self) -> u64 {
        self.submitted
    }

    fn take(&mut self) -> Vec<RequestOutcome> {
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(MAX_BATCH_OUTCOMES));
        let len = u64::try_from(batch.len()).unwrap_or(u64::MAX);
        self.submitted = self.submitted.saturating_add(len);
        batch
    }
}
