//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::TesterArgs;
pub use types::{OutputFormat, PositiveU64, PositiveUsize};

pub(crate) use defaults::DEFAULT_USER_AGENT;
