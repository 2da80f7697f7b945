use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::level::Level;
use crate::icon::IconEvent;

/// Errors from file-backed meter sources
#[derive(Debug, Error)]
pub enum MeterError {
    /// WAV file could not be opened or decoded
    #[error("failed to read WAV file {path}: {source}")]
    WavRead {
        /// Path to the file
        path: PathBuf,
        /// Underlying decoder error
        source: hound::Error,
    },

    /// WAV file holds no samples
    #[error("WAV file {0} contains no audio")]
    EmptyWav(PathBuf),

    /// Chunk length rounds to zero samples
    #[error("chunk of {chunk_ms} ms is too short for {sample_rate} Hz")]
    ChunkTooShort {
        /// Requested chunk length
        chunk_ms: u64,
        /// File sample rate
        sample_rate: u32,
    },
}

/// Decoded WAV audio, interleaved f32 in `-1.0..=1.0`
#[derive(Debug, Clone)]
pub struct WavClip {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl WavClip {
    /// Decode a WAV file (integer or float samples)
    ///
    /// # Errors
    /// Returns error if the file cannot be decoded or is empty
    pub fn open(path: &Path) -> Result<Self, MeterError> {
        let wav_err = |source| MeterError::WavRead {
            path: path.to_path_buf(),
            source,
        };
        let reader = hound::WavReader::open(path).map_err(wav_err)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(wav_err)?,
            hound::SampleFormat::Int => {
                // i32 full scale for the file's bit depth
                #[allow(clippy::cast_precision_loss)]
                let full_scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| {
                        #[allow(clippy::cast_precision_loss)]
                        let v = v as f32;
                        v / full_scale
                    }))
                    .collect::<Result<_, _>>()
                    .map_err(wav_err)?
            }
        };

        if samples.is_empty() {
            return Err(MeterError::EmptyWav(path.to_path_buf()));
        }

        info!(
            path = %path.display(),
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            samples = samples.len(),
            "WAV clip loaded"
        );

        Ok(Self {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    /// Build a clip from raw interleaved samples
    #[must_use]
    pub const fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Split into per-chunk levels, one per `chunk` of playback time
    ///
    /// # Errors
    /// Returns error if the chunk is shorter than one frame
    pub fn levels(&self, chunk: Duration) -> Result<Vec<Level>, MeterError> {
        let frames_per_chunk = u128::from(self.sample_rate) * chunk.as_millis() / 1000;
        let frames_per_chunk = usize::try_from(frames_per_chunk).unwrap_or(usize::MAX);
        if frames_per_chunk == 0 {
            return Err(MeterError::ChunkTooShort {
                chunk_ms: u64::try_from(chunk.as_millis()).unwrap_or(u64::MAX),
                sample_rate: self.sample_rate,
            });
        }

        let chunk_len = frames_per_chunk.saturating_mul(usize::from(self.channels.max(1)));
        Ok(self
            .samples
            .chunks(chunk_len)
            .map(|chunk| Level::measure(chunk, self.channels))
            .collect())
    }
}

/// Replay precomputed levels in real time, looping until the queue closes
///
/// Playback keeps its position while `active` is false but nothing is sent.
pub fn spawn_replay(
    levels: Vec<Level>,
    period: Duration,
    active: Arc<AtomicBool>,
    events: mpsc::Sender<IconEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if levels.is_empty() {
            return;
        }
        let mut interval = tokio::time::interval(period);
        for level in levels.iter().cycle() {
            interval.tick().await;
            if !active.load(Ordering::Relaxed) {
                if events.is_closed() {
                    break;
                }
                continue;
            }
            let event = IconEvent::Meter {
                average_power: level.average_power,
                peak_power: level.peak_power,
            };
            if events.send(event).await.is_err() {
                debug!("icon queue closed, replay stopped");
                break;
            }
        }
    })
}

/// Speech-like envelope at time `t` seconds
///
/// Syllable bursts of roughly 4 Hz under a slower phrase contour, with the
/// peak riding above the average.
#[must_use]
pub fn synthetic_level(t: f64) -> Level {
    let syllable = (t * 4.0 * std::f64::consts::TAU).sin().abs();
    let phrase = 0.5_f64.mul_add((t * 0.35 * std::f64::consts::TAU).sin(), 0.5);
    let average = (syllable * phrase * 0.8).clamp(0.0, 1.0);
    let peak = average.mul_add(1.25, 0.05).clamp(0.0, 1.0);
    Level {
        average_power: average,
        peak_power: peak,
    }
}

/// Emit the synthetic envelope every `period` while `active`, until the queue closes
pub fn spawn_synthetic(
    period: Duration,
    active: Arc<AtomicBool>,
    events: mpsc::Sender<IconEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if !active.load(Ordering::Relaxed) {
                if events.is_closed() {
                    break;
                }
                continue;
            }
            let level = synthetic_level(start.elapsed().as_secs_f64());
            let event = IconEvent::Meter {
                average_power: level.average_power,
                peak_power: level.peak_power,
            };
            if events.send(event).await.is_err() {
                debug!("icon queue closed, synthetic meter stopped");
                break;
            }
        }
    })
}
