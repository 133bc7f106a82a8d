use serde::Deserialize;

use crate::args::OutputFormat;

/// A batch of runs read from a `.toml` or `.json` file. Every top-level field
/// is optional; unset fields fall back to the command line.
#[derive(Debug, Default, Deserialize)]
pub struct BatchFile {
    pub name: Option<String>,
    pub distributed: Option<bool>,
    pub worker: Option<bool>,
    pub url: Option<String>,
    #[serde(default)]
    pub runs: Vec<RunEntry>,
    pub output: Option<String>,
    pub format: Option<OutputFormat>,
    pub expected_agents: Option<usize>,
    pub coordinator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunEntry {
    pub requests: u64,
    pub concurrency: usize,
    /// Overrides the batch URL for this run.
    pub url: Option<String>,
    /// Overrides the generated `RIDnnn` run id.
    pub id: Option<String>,
}
