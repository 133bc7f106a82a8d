use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult, ConfigError};

/// Prints a rendered report, or appends it to `output` when set.
///
/// # Errors
///
/// Returns an error when the output file cannot be opened or written.
pub async fn emit_report(rendered: &str, output: Option<&Path>) -> AppResult<()> {
    let Some(path) = output else {
        print!("{}", rendered);
        return Ok(());
    };

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|err| {
            AppError::config(ConfigError::OpenOutput {
                path: path.to_path_buf(),
                source: err,
            })
        })?;
    file.write_all(rendered.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
