use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user refused device access. Surfaced as an actionable prompt,
    /// never swallowed.
    #[error("microphone access was denied")]
    PermissionDenied,

    #[error("capture device failed: {0}")]
    Device(String),
}

/// Parameters for a capture request. Mono PCM16 throughout.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConstraints {
    pub sample_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self { sample_rate: 16_000 }
    }
}

/// A live input stream: the device layer pushes PCM frames until it
/// closes the channel.
pub struct AudioStream {
    pub sample_rate: u32,
    pub frames: mpsc::Receiver<Vec<i16>>,
}

/// Device seam. The real microphone lives outside this crate; embedders
/// hand in whatever their platform provides, tests hand in a script.
pub trait AudioSource: Send + Sync {
    fn open(&self, constraints: CaptureConstraints) -> Result<AudioStream, CaptureError>;
}

/// A finished recording, encoded and measured, ready for upload.
pub struct EncodedBlob {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub extension: &'static str,
    pub duration_seconds: f64,
}

/// An in-progress recording. Stop it to get the encoded blob, or cancel
/// to throw the audio away without touching anything downstream.
#[derive(Debug)]
pub struct CaptureHandle {
    cancel: CancellationToken,
    drain: JoinHandle<Vec<i16>>,
    sample_rate: u32,
}

/// Open the device and start draining frames. Permission refusal fails
/// here, before any task is spawned.
pub fn start_capture(
    source: &dyn AudioSource,
    constraints: CaptureConstraints,
) -> Result<CaptureHandle, CaptureError> {
    let mut stream = source.open(constraints)?;
    let sample_rate = stream.sample_rate;

    let cancel = CancellationToken::new();
    let stopped = cancel.clone();
    let drain = tokio::spawn(async move {
        let mut samples: Vec<i16> = Vec::new();
        loop {
            tokio::select! {
                // Stop cuts the recording at the frames drained so far.
                biased;
                _ = stopped.cancelled() => break,
                frame = stream.frames.recv() => match frame {
                    Some(mut frame) => samples.append(&mut frame),
                    None => break,
                },
            }
        }
        samples
    });

    debug!("Capture started at {} Hz", sample_rate);
    Ok(CaptureHandle {
        cancel,
        drain,
        sample_rate,
    })
}

impl CaptureHandle {
    /// Finish the recording: stop draining, measure, encode as WAV.
    pub async fn stop(self) -> Result<EncodedBlob, CaptureError> {
        self.cancel.cancel();
        let samples = self
            .drain
            .await
            .map_err(|e| CaptureError::Device(format!("capture task failed: {e}")))?;

        let duration_seconds = samples.len() as f64 / self.sample_rate as f64;
        let bytes = encode_wav_pcm16_mono(&samples, self.sample_rate);
        info!(
            "Capture stopped: {:.2}s, {} bytes encoded",
            duration_seconds,
            bytes.len()
        );
        Ok(EncodedBlob {
            bytes,
            mime: "audio/wav",
            extension: "wav",
            duration_seconds,
        })
    }

    /// Abandon the recording. The buffered audio is discarded with no
    /// store interaction.
    pub async fn cancel(self) {
        self.cancel.cancel();
        let _ = self.drain.await;
        debug!("Capture cancelled");
    }
}

/// Wrap raw samples in a minimal WAV envelope (PCM16, one channel).
///
/// Layout: RIFF header, 16-byte `fmt ` chunk, `data` chunk. All fields
/// little-endian.
pub fn encode_wav_pcm16_mono(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}
