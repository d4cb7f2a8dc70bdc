//! On-disk storage of raw product images.
//!
//! Files are named `{id}.{ext}`, so a product's image location follows
//! from its id.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use catalens_common::{CatalogError, Result};

/// Directory of product images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an image for `id` is stored under
    pub fn path_for(&self, id: Uuid, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, sanitize_extension(extension)))
    }

    /// Write the bytes for `id`
    ///
    /// Data goes to a temporary file first and is renamed into place, so a
    /// reader never sees a partial image.
    pub async fn save(&self, id: Uuid, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            CatalogError::storage(format!(
                "Failed to create image directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let dest = self.path_for(id, extension);
        let temp_path = self.root.join(format!(".{}.tmp", id));

        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &dest).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CatalogError::storage(format!("Failed to store image {}: {}", id, e)));
        }

        debug!("Stored image {} ({} bytes)", dest.display(), bytes.len());
        Ok(dest)
    }

    /// Read an image file back
    ///
    /// A missing file is `NotFound`.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CatalogError::not_found(
                format!("Image file {} is missing", display_name(path)),
            )),
            Err(e) => Err(CatalogError::storage(format!(
                "Failed to read image {}: {}",
                display_name(path),
                e
            ))),
        }
    }

    /// Whether the file behind a record exists
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
    }

    /// Remove an image, used to undo a failed upload
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image {} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(CatalogError::storage(format!(
                "Failed to remove image {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn sanitize_extension(extension: &str) -> String {
    let ext: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        "img".to_string()
    } else {
        ext
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "<unnamed>".to_string())
}
