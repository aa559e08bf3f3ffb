pub mod blobs;
pub mod capture;
pub mod pipeline;

pub use blobs::{BlobStore, UploadError};
pub use capture::{
    AudioSource, AudioStream, CaptureConstraints, CaptureError, CaptureHandle, EncodedBlob,
    start_capture,
};
pub use pipeline::{VoiceMessageError, VoicePipeline};
