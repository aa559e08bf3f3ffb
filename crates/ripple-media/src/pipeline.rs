use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use ripple_types::Draft;

use crate::blobs::{BlobStore, UploadError};
use crate::capture::{AudioSource, CaptureConstraints, CaptureError, CaptureHandle, start_capture};

#[derive(Debug, Error)]
pub enum VoiceMessageError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Microphone → encoded blob → object storage → audio draft.
///
/// The draft goes to the lifecycle manager's `send` like any other; this
/// pipeline only owns the capture and upload legs.
pub struct VoicePipeline {
    blobs: Arc<BlobStore>,
}

impl VoicePipeline {
    pub fn new(blobs: Arc<BlobStore>) -> Self {
        Self { blobs }
    }

    /// Begin recording. `PermissionDenied` comes back straight from the
    /// device seam.
    pub fn start(
        &self,
        source: &dyn AudioSource,
        constraints: CaptureConstraints,
    ) -> Result<CaptureHandle, CaptureError> {
        start_capture(source, constraints)
    }

    /// Stop recording, upload, and produce the ready-to-send draft. Any
    /// failure discards the recorded bytes; the user re-records.
    pub async fn finish(&self, handle: CaptureHandle) -> Result<Draft, VoiceMessageError> {
        let blob = handle.stop().await?;
        let url = match self.blobs.upload(&blob).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Voice upload failed, recording discarded: {}", e);
                return Err(e.into());
            }
        };
        Ok(Draft::audio(url, blob.duration_seconds))
    }

    /// Abandon an in-progress recording before it is stopped.
    pub async fn discard(&self, handle: CaptureHandle) {
        handle.cancel().await;
    }
}
