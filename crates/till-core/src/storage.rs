//! On-disk storage for uploaded receipt files.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, TillError};
use crate::models::config::StorageConfig;
use crate::models::receipt::{MimeType, StoredFile};

/// Stores uploads as `receipt-<uuid>.<ext>` under one upload directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_dir: PathBuf,
    max_file_size: u64,
}

impl FileStorage {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_file_size: StorageConfig::default().max_file_size,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.upload_dir).with_max_file_size(config.max_file_size)
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Write an upload to disk.
    ///
    /// The declared MIME type is recorded as given; only the stored file's
    /// extension is derived from it.
    pub async fn store(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
    ) -> Result<StoredFile> {
        let size = bytes.len() as u64;
        if size > self.max_file_size {
            return Err(TillError::validation(
                "file",
                format!("{} bytes exceeds the {} byte limit", size, self.max_file_size),
            ));
        }

        let extension = match mime_type.parse::<MimeType>() {
            Ok(mime) => mime.extension().to_string(),
            Err(_) => Path::new(original_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_else(|| "bin".to_string()),
        };

        fs::create_dir_all(&self.upload_dir).await?;
        let stored_path = self
            .upload_dir
            .join(format!("receipt-{}.{}", Uuid::new_v4(), extension));

        // Write to a temp name and rename so a crash never leaves half a file
        let temp_path = stored_path.with_extension("tmp");
        write_atomically(&temp_path, &stored_path, bytes).await?;

        debug!("Stored {} as {} ({} bytes)", original_name, stored_path.display(), size);

        Ok(StoredFile {
            original_name: original_name.to_string(),
            stored_path,
            mime_type: mime_type.to_string(),
            size_bytes: size,
        })
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path).await?)
    }

    /// Remove a stored file. Removing a file that is already gone succeeds.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file, logging instead of failing.
    pub async fn remove_best_effort(&self, path: &Path) {
        if let Err(e) = self.delete(path).await {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Write `bytes` to `temp_path`, then rename it to `path`. The temp file is
/// removed again if any step fails.
async fn write_atomically(temp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let result = async {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp_path, path).await
    }
    .await;

    if result.is_err() {
        match fs::remove_file(temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", temp_path.display(), e),
        }
    }
    result
}
