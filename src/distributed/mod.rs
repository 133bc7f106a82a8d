//! Coordinator/agent split of a single logical run.
mod agent;
mod controller;
mod protocol;

pub use agent::run_agent;
pub use controller::{Coordinator, run_coordinator};

#[cfg(test)]
mod tests;
