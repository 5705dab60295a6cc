//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tokio::runtime::RuntimeFlavor;

use crate::session::{PlaybackDone, PlaybackResource, Speaker};
use crate::{Error, Result};

/// Sample rate assumed when the MP3 stream carries none (common TTS output)
const FALLBACK_SAMPLE_RATE: u32 = 24000;

/// How often the playback thread checks for stop or completion
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Mono PCM decoded from MP3
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Default system output device
#[derive(Debug, Default)]
pub struct CpalSpeaker;

impl CpalSpeaker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Speaker for CpalSpeaker {
    fn load(&mut self, audio: Vec<u8>, done: PlaybackDone) -> Result<Box<dyn PlaybackResource>> {
        let decoded = decode_mp3(&audio)?;
        tracing::debug!(
            samples = decoded.samples.len(),
            sample_rate = decoded.sample_rate,
            "speech audio loaded"
        );

        Ok(Box::new(CpalPlayback {
            audio: Some(decoded),
            done: Some(done),
            stopped: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// One loaded clip; plays once on its own thread
struct CpalPlayback {
    audio: Option<DecodedAudio>,
    done: Option<PlaybackDone>,
    stopped: Arc<AtomicBool>,
}

impl PlaybackResource for CpalPlayback {
    fn play(&mut self) -> Result<()> {
        let Some(audio) = self.audio.take() else {
            return Ok(());
        };
        let done = self.done.take();
        let stopped = Arc::clone(&self.stopped);
        let (started_tx, started_rx) = std_mpsc::channel::<Result<()>>();

        std::thread::Builder::new()
            .name("alex-playback".to_string())
            .spawn(move || {
                let finished = Arc::new(AtomicBool::new(false));
                let expected = duration_of(&audio);

                let stream = match start_output(audio, Arc::clone(&stopped), Arc::clone(&finished)) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = started_tx.send(Err(e));
                        return;
                    }
                };
                let _ = started_tx.send(Ok(()));

                // Poll for completion with timeout
                let start = Instant::now();
                let timeout = expected + Duration::from_millis(500);
                while !finished.load(Ordering::Acquire) && !stopped.load(Ordering::Acquire) {
                    if start.elapsed() > timeout {
                        break;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }

                drop(stream);

                if stopped.load(Ordering::Acquire) {
                    tracing::debug!("playback stopped");
                } else if let Some(done) = done {
                    tracing::debug!("playback complete");
                    done.finished();
                }
            })?;

        wait_started(&started_rx)
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        self.audio = None;
        self.done = None;
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Wait for the playback thread to report whether the device opened
///
/// Called from the session's task, so on a multi-threaded runtime the wait
/// moves off the async worker.
fn wait_started(started: &std_mpsc::Receiver<Result<()>>) -> Result<()> {
    let recv = || -> Result<()> {
        started
            .recv()
            .map_err(|_| Error::Audio("playback thread exited early".to_string()))?
    };

    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(recv)
        }
        _ => recv(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn duration_of(audio: &DecodedAudio) -> Duration {
    Duration::from_secs_f64(audio.samples.len() as f64 / f64::from(audio.sample_rate.max(1)))
}

/// Open the default output device and start streaming `audio`
///
/// The callback emits silence as soon as `stopped` is set and raises
/// `finished` once every sample has been written.
fn start_output(
    audio: DecodedAudio,
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
) -> Result<Stream> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let rate = SampleRate(audio.sample_rate);
    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| c.channels() == 1 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported.with_sample_rate(rate).config();
    let channels = usize::from(config.channels);

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = audio.sample_rate,
        channels,
        "audio playback initialized"
    );

    let samples = audio.samples;
    let mut position = 0usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let halted = stopped.load(Ordering::Acquire);
                for frame in data.chunks_mut(channels) {
                    let sample = if halted {
                        0.0
                    } else if let Some(&s) = samples.get(position) {
                        position += 1;
                        s
                    } else {
                        finished.store(true, Ordering::Release);
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(stream)
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not decodable MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate.is_none() {
                    sample_rate = u32::try_from(frame.sample_rate).ok().filter(|r| *r > 0);
                }

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_decodes_to_silence() {
        let decoded = decode_mp3(&[]).unwrap();
        assert!(decoded.samples.is_empty());
        assert_eq!(decoded.sample_rate, FALLBACK_SAMPLE_RATE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_wait_runs_off_the_async_worker() {
        let (tx, rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let _ = tx.send(Err(Error::Audio("no output device available".to_string())));
        });

        let err = wait_started(&rx).unwrap_err();
        assert!(matches!(err, Error::Audio(ref msg) if msg.contains("no output device")));
    }

    #[test]
    fn start_wait_reports_vanished_thread() {
        let (tx, rx) = std_mpsc::channel::<Result<()>>();
        drop(tx);

        assert!(matches!(wait_started(&rx), Err(Error::Audio(_))));
    }

    #[test]
    fn duration_follows_sample_rate() {
        let audio = DecodedAudio {
            samples: vec![0.0; 24000],
            sample_rate: 24000,
        };
        assert_eq!(duration_of(&audio), Duration::from_secs(1));
    }
}
