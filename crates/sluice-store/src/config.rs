use std::env::VarError;
use std::path::PathBuf;

use sluice_core::AppError;

pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Configuration for the batch output directory.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub output_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `SLUICE_OUTPUT_DIR` (optional, defaults to `data`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_var(std::env::var("SLUICE_OUTPUT_DIR"))
    }

    /// An explicit directory wins over `SLUICE_OUTPUT_DIR`.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, AppError> {
        match explicit {
            Some(dir) if dir.as_os_str().is_empty() => Err(AppError::ConfigError(
                "output directory must not be empty".into(),
            )),
            Some(dir) => Ok(Self::new(dir)),
            None => Self::from_env(),
        }
    }

    fn from_var(var: Result<String, VarError>) -> Result<Self, AppError> {
        match var {
            Err(VarError::NotPresent) => Ok(Self::default()),
            Err(VarError::NotUnicode(raw)) => Err(AppError::ConfigError(format!(
                "SLUICE_OUTPUT_DIR is not valid UTF-8: {raw:?}"
            ))),
            Ok(raw) if raw.trim().is_empty() => Err(AppError::ConfigError(
                "SLUICE_OUTPUT_DIR must not be empty".into(),
            )),
            Ok(raw) => Ok(Self::new(raw)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}
