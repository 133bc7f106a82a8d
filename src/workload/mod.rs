//! Splitting request and concurrency targets into lanes and agent shares.
mod partition;


pub use partition::{AgentShare, DispatchPlan};
