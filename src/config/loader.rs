use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::BatchFile;

/// Loads the batch file named on the command line, if any.
///
/// # Errors
///
/// Returns an error when the batch file cannot be read or parsed.
pub fn load_batch(path: Option<&str>) -> AppResult<Option<BatchFile>> {
    match path {
        Some(path) => Ok(Some(load_batch_file(&PathBuf::from(path))?)),
        None => Ok(None),
    }
}

/// Parses a batch file, choosing the format from its extension.
///
/// # Errors
///
/// Returns an error when the file is unreadable, malformed, or has an
/// extension other than `.toml`/`.json`.
pub fn load_batch_file(path: &Path) -> AppResult<BatchFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}
