use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read batch file '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML batch file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON batch file '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported batch file extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Batch file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Run {index} must set concurrency >= 1.")]
    RunConcurrencyZero { index: usize },
    #[error("Failed to open output '{path}': {source}")]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
