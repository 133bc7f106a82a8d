#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Local,
    Coordinator,
    Agent,
}

impl RunMode {
    #[must_use]
    pub const fn from_flags(distributed: bool, worker: bool) -> Self {
        match (distributed, worker) {
            (true, true) => RunMode::Agent,
            (true, false) => RunMode::Coordinator,
            (false, _) => RunMode::Local,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunMode::Local => "local",
            RunMode::Coordinator => "coordinator",
            RunMode::Agent => "agent",
        }
    }
}

/// Terminal progress bar for a run. Drawn on stderr only when it is a
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSettings {
    pub enabled: bool,
    pub no_color: bool,
}

/// One resolved run of a batch. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub name: String,
    pub run_id: String,
    pub target_url: String,
    pub total_requests: u64,
    pub concurrency: usize,
    pub mode: RunMode,
    /// Only meaningful for [`RunMode::Coordinator`].
    pub expected_agents: usize,
    /// Listen address for a coordinator, join address for an agent.
    pub coordinator_addr: String,
    /// Carried through from configuration; not enforced.
    pub rate_limit: Option<u64>,
    /// Index of this process's first lane in the request id tags. Non-zero
    /// only for agents, so ids stay unique across a distributed run.
    pub first_lane: usize,
    pub progress: ProgressSettings,
}

impl RunConfiguration {
    /// Copy of this run sized to an agent's share, executed as a local run
    /// whose lanes are numbered from `first_lane`.
    #[must_use]
    pub fn with_share(&self, total_requests: u64, concurrency: usize, first_lane: usize) -> Self {
        Self {
            total_requests,
            concurrency,
            first_lane,
            mode: RunMode::Local,
            ..self.clone()
        }
    }
}
