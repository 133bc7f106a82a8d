//! Response classification and single-owner result aggregation.
mod classify;
mod collector;
mod types;


pub use classify::classify;
pub use collector::{Aggregate, OUTCOME_CHANNEL_CAPACITY, OutcomeCounter, spawn_aggregator};
pub use types::{
    ErrorTally, Histogram, RequestOutcome, RunReport, STATUS_CLASS_COUNT, StatusClass,
    TRANSPORT_FAILURE_STATUS,
};
