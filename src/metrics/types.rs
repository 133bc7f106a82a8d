use std::collections::BTreeMap;

/// Status used for outcomes that never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

pub const STATUS_CLASS_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status_code: u16,
    pub failure_reason: String,
}

impl RequestOutcome {
    #[must_use]
    pub const fn status(status_code: u16) -> Self {
        Self {
            status_code,
            failure_reason: String::new(),
        }
    }

    /// A request that failed before a status was observed. An empty reason is
    /// replaced so the outcome is never mistaken for a placeholder.
    #[must_use]
    pub fn transport_failure(reason: impl Into<String>) -> Self {
        let mut failure_reason = reason.into();
        if failure_reason.is_empty() {
            "unknown transport failure".clone_into(&mut failure_reason);
        }
        Self {
            status_code: TRANSPORT_FAILURE_STATUS,
            failure_reason,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.status_code == TRANSPORT_FAILURE_STATUS && self.failure_reason.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    Unclassified,
}

impl StatusClass {
    pub const ALL: [StatusClass; STATUS_CLASS_COUNT] = [
        StatusClass::Informational,
        StatusClass::Success,
        StatusClass::Redirection,
        StatusClass::ClientError,
        StatusClass::ServerError,
        StatusClass::Unclassified,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            StatusClass::Informational => 0,
            StatusClass::Success => 1,
            StatusClass::Redirection => 2,
            StatusClass::ClientError => 3,
            StatusClass::ServerError => 4,
            StatusClass::Unclassified => 5,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            StatusClass::Informational => "1xx",
            StatusClass::Success => "2xx",
            StatusClass::Redirection => "3xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
            StatusClass::Unclassified => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; STATUS_CLASS_COUNT],
}

impl Histogram {
    #[must_use]
    pub const fn from_counts(counts: [u64; STATUS_CLASS_COUNT]) -> Self {
        Self { counts }
    }

    pub fn record(&mut self, class: StatusClass) {
        if let Some(slot) = self.counts.get_mut(class.index()) {
            *slot = slot.saturating_add(1);
        }
    }

    #[must_use]
    pub fn count(&self, class: StatusClass) -> u64 {
        self.counts.get(class.index()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, value| acc.saturating_add(*value))
    }

    #[must_use]
    pub const fn counts(&self) -> [u64; STATUS_CLASS_COUNT] {
        self.counts
    }
}

/// Failure reason -> occurrences, for unclassified outcomes only.
pub type ErrorTally = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub total_attempted: u64,
    pub histogram: Histogram,
    pub errors: ErrorTally,
}
