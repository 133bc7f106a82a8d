mod export;
mod progress;
mod runner;
pub(crate) mod summary;


pub use export::emit_report;
pub(crate) use progress::ProgressBar;
pub use runner::run_local;
pub use summary::{ReportContext, render_report};
