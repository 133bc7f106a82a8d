use std::fmt;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Idle,
    AwaitingRegistrations,
    Running,
    Merging,
    Complete,
}

impl Phase {
    pub(super) const fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitingRegistrations => "awaiting-registrations",
            Phase::Running => "running",
            Phase::Merging => "merging",
            Phase::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current coordinator phase; every change is logged.
#[derive(Debug)]
pub(super) struct PhaseTracker {
    run_id: String,
    phase: Phase,
}

impl PhaseTracker {
    pub(super) const fn new(run_id: String) -> Self {
        Self {
            run_id,
            phase: Phase::Idle,
        }
    }

    pub(super) const fn current(&self) -> Phase {
        self.phase
    }

    pub(super) fn advance(&mut self, next: Phase) {
        if self.phase == next {
            return;
        }
        info!(
            "Coordinator for run {}: {} -> {}",
            self.run_id, self.phase, next
        );
        self.phase = next;
    }
}

/// Reported by connection handlers to the coordinator loop.
#[derive(Debug)]
pub(super) enum AgentEvent {
    Registered { agent_id: u64 },
    BatchReceived { agent_id: u64, outcomes: usize },
    Finished { agent_id: u64 },
    Dropped { agent_id: Option<u64>, reason: String },
}

/// Agent bookkeeping for the completion rule.
#[derive(Debug, Default)]
pub(super) struct Roster {
    expected: usize,
    registered: usize,
    finished: usize,
    dropped: usize,
}

impl Roster {
    pub(super) fn new(expected: usize) -> Self {
        Self {
            expected,
            ..Self::default()
        }
    }

    pub(super) fn apply(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::Registered { .. } => self.registered = self.registered.saturating_add(1),
            AgentEvent::Finished { .. } => self.finished = self.finished.saturating_add(1),
            AgentEvent::Dropped {
                agent_id: Some(_), ..
            } => self.dropped = self.dropped.saturating_add(1),
            AgentEvent::BatchReceived { .. } | AgentEvent::Dropped { agent_id: None, .. } => {}
        }
    }

    pub(super) const fn finished(&self) -> usize {
        self.finished
    }

    pub(super) const fn registered(&self) -> usize {
        self.registered
    }

    pub(super) fn active(&self) -> usize {
        self.registered
            .saturating_sub(self.finished)
            .saturating_sub(self.dropped)
    }

    /// Enough agents delivered a final batch and none is still streaming.
    pub(super) fn is_complete(&self) -> bool {
        self.finished >= self.expected && self.active() == 0
    }
}
