use std::path::PathBuf;

use chrono::Utc;
use rand::RngCore;
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::capture::EncodedBlob;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("blob could not be stored: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage for media attachments.
///
/// Blobs land under a storage directory with collision-resistant keys and
/// are addressed by public URL afterwards. An upload either fully lands
/// or fails; there is no retry queue, so a failed voice upload means the
/// user re-records.
pub struct BlobStore {
    dir: PathBuf,
    base_url: String,
}

impl BlobStore {
    pub async fn new(dir: PathBuf, base_url: impl Into<String>) -> Result<Self, UploadError> {
        fs::create_dir_all(&dir).await?;
        let base_url = base_url.into();
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir, base_url })
    }

    /// `{unix_millis}-{random}.{ext}`: timestamp for rough ordering,
    /// random suffix against same-millisecond collisions.
    fn object_key(extension: &str) -> String {
        let mut random = [0u8; 8];
        rand::rng().fill_bytes(&mut random);
        format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            hex::encode(random),
            extension
        )
    }

    /// Write the blob and return its public URL.
    pub async fn upload(&self, blob: &EncodedBlob) -> Result<String, UploadError> {
        let key = Self::object_key(blob.extension);
        let path = self.dir.join(&key);
        fs::write(&path, &blob.bytes).await?;

        info!("Uploaded {} ({} bytes)", key, blob.bytes.len());
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}
