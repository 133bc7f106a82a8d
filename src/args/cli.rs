use clap::Parser;

use super::defaults::{
    DEFAULT_COORDINATOR_ADDR, DEFAULT_EXPECTED_AGENTS, DEFAULT_TEST_NAME, DEFAULT_URL,
};
use super::parsers::{parse_bool_env, parse_positive_u64, parse_positive_usize};
use super::types::{OutputFormat, PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "HTTP load generator that can split one test across a coordinator and several agents.",
    next_help_heading = "Advanced Options"
)]
pub struct TesterArgs {
    /// Run counter used as the RID part of the id header (1 numbers runs by position)
    #[arg(long = "run", default_value = "1", value_parser = parse_positive_u64)]
    pub run: PositiveU64,

    /// Number of concurrent lanes
    #[arg(
        long = "concurrency",
        short = 'c',
        default_value = "1",
        value_parser = parse_positive_usize,
        help_heading = "Common Options"
    )]
    pub concurrency: PositiveUsize,

    /// Number of requests to perform
    #[arg(
        long = "requests",
        short = 'n',
        default_value = "1",
        help_heading = "Common Options"
    )]
    pub requests: u64,

    /// Target URL to send requests to
    #[arg(long, short, default_value = DEFAULT_URL, help_heading = "Common Options")]
    pub url: String,

    /// Maximum time to read a full response, in milliseconds
    #[arg(long = "rtimeout", default_value = "500", value_parser = parse_positive_u64)]
    pub read_timeout_ms: PositiveU64,

    /// Maximum time to write a full request, in milliseconds
    #[arg(long = "wtimeout", default_value = "500", value_parser = parse_positive_u64)]
    pub write_timeout_ms: PositiveU64,

    /// Maximum idle connections kept per host
    #[arg(long = "maxconn", default_value = "1000", value_parser = parse_positive_usize)]
    pub max_connections: PositiveUsize,

    /// Split the test across agents (coordinator unless --worker is set)
    #[arg(long, help_heading = "Distributed Options")]
    pub distributed: bool,

    /// Join a coordinator as an agent (only with --distributed)
    #[arg(long, help_heading = "Distributed Options")]
    pub worker: bool,

    /// Coordinator address: listen address for the coordinator, join address for agents
    #[arg(
        long = "coordinator",
        env = "BLOWHOLE_COORDINATOR",
        default_value = DEFAULT_COORDINATOR_ADDR,
        help_heading = "Distributed Options"
    )]
    pub coordinator: String,

    /// Agents the coordinator waits for (at least 2)
    #[arg(
        long = "expected-agents",
        default_value_t = DEFAULT_EXPECTED_AGENTS,
        help_heading = "Distributed Options"
    )]
    pub expected_agents: usize,

    /// Output file to append results to (stdout when unset)
    #[arg(long = "output", short = 'o', help_heading = "Common Options")]
    pub output: Option<String>,

    /// Output format (defaults to compact with --output, text otherwise)
    #[arg(long = "output-format", value_enum, help_heading = "Common Options")]
    pub output_format: Option<OutputFormat>,

    /// Batch file (TOML/JSON) describing a sequence of runs
    #[arg(long = "file", short = 'f', help_heading = "Common Options")]
    pub file: Option<String>,

    /// Test name shown in reports
    #[arg(long, default_value = DEFAULT_TEST_NAME)]
    pub name: String,

    /// Requests per second (accepted but not enforced)
    #[arg(long = "rate")]
    pub rate: Option<u64>,

    /// Enable verbose logging (sets log level to debug unless overridden by BLOWHOLE_LOG/RUST_LOG)
    #[arg(long, short = 'v', alias = "debug", help_heading = "Common Options")]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    /// Do not draw the progress bar on stderr
    #[arg(long = "no-progress", help_heading = "Common Options")]
    pub no_progress: bool,
}
