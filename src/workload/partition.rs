use tracing::debug;

use crate::error::{DistributedError, ValidationError};

/// Per-lane request counts for one run. Lane count equals the requested
/// concurrency and the sizes always sum to the requested total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    lanes: Vec<u64>,
    first_lane: usize,
}

impl DispatchPlan {
    /// Splits `total_requests` evenly across `concurrency` lanes; the division
    /// remainder goes to the first lane.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConcurrency`] when `concurrency` is 0.
    pub fn new(total_requests: u64, concurrency: usize) -> Result<Self, ValidationError> {
        if concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }
        let lane_count = u64::try_from(concurrency).unwrap_or(u64::MAX);
        let base = total_requests.checked_div(lane_count).unwrap_or(0);
        let remainder = total_requests.checked_rem(lane_count).unwrap_or(0);

        let mut lanes = vec![base; concurrency];
        if let Some(first) = lanes.first_mut() {
            *first = first.saturating_add(remainder);
        }
        Ok(Self {
            lanes,
            first_lane: 0,
        })
    }

    /// Numbers the lanes from `first_lane` instead of 0.
    #[must_use]
    pub fn starting_at(self, first_lane: usize) -> Self {
        Self { first_lane, ..self }
    }

    #[must_use]
    pub const fn first_lane(&self) -> usize {
        self.first_lane
    }

    #[must_use]
    pub fn lanes(&self) -> &[u64] {
        &self.lanes
    }

    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.lanes
            .iter()
            .fold(0u64, |acc, lane| acc.saturating_add(*lane))
    }
}

/// What every agent of a distributed run is asked to execute.
///
/// Both dimensions use ceiling division, so `agents` shares together can
/// exceed the original target by up to `agents - 1` units each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentShare {
    pub requests: u64,
    pub concurrency: u64,
}

impl AgentShare {
    /// # Errors
    ///
    /// Returns [`DistributedError::InsufficientAgents`] when `agents < 2`.
    pub fn split(
        total_requests: u64,
        concurrency: u64,
        agents: usize,
    ) -> Result<Self, DistributedError> {
        if agents < 2 {
            return Err(DistributedError::InsufficientAgents { expected: agents });
        }
        let divisor = u64::try_from(agents).unwrap_or(u64::MAX);
        let share = Self {
            requests: total_requests.div_ceil(divisor),
            concurrency: concurrency.div_ceil(divisor),
        };

        let (extra_requests, extra_concurrency) =
            share.overshoot(total_requests, concurrency, agents);
        if extra_requests > 0 || extra_concurrency > 0 {
            debug!(
                "Agent share over-provisions by {} requests and {} lanes across {} agents",
                extra_requests, extra_concurrency, agents
            );
        }
        Ok(share)
    }

    /// Units provisioned beyond the original targets when `agents` agents
    /// each run this share.
    #[must_use]
    pub fn overshoot(&self, total_requests: u64, concurrency: u64, agents: usize) -> (u64, u64) {
        let agents = u64::try_from(agents).unwrap_or(u64::MAX);
        (
            self.requests
                .saturating_mul(agents)
                .saturating_sub(total_requests),
            self.concurrency
                .saturating_mul(agents)
                .saturating_sub(concurrency),
        )
    }
}
