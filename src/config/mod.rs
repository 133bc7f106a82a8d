//! Batch file loading and run planning.
mod loader;
mod plan;
pub mod types;


pub use loader::{load_batch, load_batch_file};
pub use plan::{BatchPlan, plan_runs};
