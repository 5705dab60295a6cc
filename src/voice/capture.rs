//! Audio capture from microphone

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tokio::sync::oneshot;

use crate::session::{CaptureHandle, Microphone, Recording};
use crate::{Error, Result};

/// Preferred sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

type ChunkBuffer = Arc<Mutex<Vec<Vec<f32>>>>;

/// Default system input device
#[derive(Debug, Default)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn open(&mut self) -> Result<Box<dyn CaptureHandle>> {
        let chunks: ChunkBuffer = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<u32>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let buffer = Arc::clone(&chunks);
        let thread = std::thread::Builder::new()
            .name("alex-capture".to_string())
            .spawn(move || {
                let (stream, sample_rate) = match open_input_stream(buffer) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(sample_rate));

                // Blocks until finalize or until the handle is dropped
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("audio capture stopped");
            })?;

        let sample_rate = ready_rx
            .await
            .map_err(|_| Error::Audio("capture thread exited early".to_string()))??;

        tracing::debug!(sample_rate, "audio capture started");
        Ok(Box::new(CpalCapture {
            chunks,
            sample_rate,
            stop: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

/// Open the default input device and start buffering into `buffer`
///
/// Every callback buffer becomes one chunk, so chunk order is arrival order.
fn open_input_stream(buffer: ChunkBuffer) -> Result<(Stream, u32)> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| Error::PermissionDenied("no input device available".to_string()))?;

    let mono = device
        .supported_input_configs()
        .map_err(|e| Error::PermissionDenied(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        });

    let config: StreamConfig = match mono {
        Some(supported) => supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config(),
        None => device
            .default_input_config()
            .map_err(|e| Error::PermissionDenied(e.to_string()))?
            .config(),
    };

    let channels = usize::from(config.channels);
    let sample_rate = config.sample_rate.0;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate,
        channels,
        "audio capture initialized"
    );

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                #[allow(clippy::cast_precision_loss)]
                let chunk: Vec<f32> = if channels > 1 {
                    data.chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                        .collect()
                } else {
                    data.to_vec()
                };
                if let Ok(mut buf) = buffer.lock() {
                    buf.push(chunk);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::PermissionDenied(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    Ok((stream, sample_rate))
}

/// Open capture device; dropping it releases the device
struct CpalCapture {
    chunks: ChunkBuffer,
    sample_rate: u32,
    stop: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

#[async_trait]
impl CaptureHandle for CpalCapture {
    async fn finalize(&mut self) -> Result<Recording> {
        // Closing the channel wakes the capture thread
        self.stop.take();

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|e| Error::Audio(format!("capture join failed: {e}")))?
                .map_err(|_| Error::Audio("capture thread panicked".to_string()))?;
        }

        let chunks = self
            .chunks
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        tracing::debug!(chunks = chunks.len(), "capture finalized");
        Ok(Recording {
            sample_rate: self.sample_rate,
            chunks,
        })
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop.take();
    }
}

/// Convert f32 samples to WAV bytes for transcription
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
