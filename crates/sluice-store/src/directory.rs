use std::path::{Path, PathBuf};

use sluice_core::AppError;
use sluice_core::traits::BatchStore;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::config::StoreConfig;

/// Append-only directory of immutably-named batch files.
///
/// Opening the store creates the directory; this is the only filesystem
/// bootstrap and happens once, before any round runs. Writes never replace
/// an existing file.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Create the output directory (and parents) if missing.
    pub async fn open(config: &StoreConfig) -> Result<Self, AppError> {
        let dir = config.output_dir.clone();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::StorageError(format!("Failed to create {}: {e}", dir.display()))
        })?;
        tracing::info!(dir = %dir.display(), "Output directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a blob name to a path directly inside the directory.
    fn path_for(&self, name: &str) -> Result<PathBuf, AppError> {
        let is_plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().is_some_and(|f| f == name);
        if !is_plain {
            return Err(AppError::StorageError(format!(
                "Invalid batch name '{name}'"
            )));
        }
        Ok(self.dir.join(name))
    }

    async fn write_new(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(contents).await?;
        file.sync_all().await
    }
}

impl BatchStore for DirectoryStore {
    async fn write(&self, name: &str, contents: &[u8]) -> Result<(), AppError> {
        let path = self.path_for(name)?;

        if let Err(e) = Self::write_new(&path, contents).await {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                // Do not leave a truncated unit behind.
                let _ = fs::remove_file(&path).await;
            }
            return Err(AppError::StorageError(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), bytes = contents.len(), "Blob written");
        Ok(())
    }
}
