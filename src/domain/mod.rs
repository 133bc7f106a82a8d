pub mod run;

pub use run::{ProgressSettings, RunConfiguration, RunMode};
