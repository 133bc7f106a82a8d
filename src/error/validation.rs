use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Concurrency must be >= 1.")]
    InvalidConcurrency,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid boolean value '{value}'.")]
    InvalidBoolean { value: String },
    #[error("Missing URL (set --url or provide in the batch file).")]
    MissingUrl,
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Batch contains no runs.")]
    EmptyBatch,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
