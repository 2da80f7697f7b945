//! Meter sources that feed the icon
//!
//! Each source turns audio into [`IconEvent::Meter`] readings on the icon
//! queue: the default microphone, a WAV file replayed in real time, or a
//! synthetic speech-like envelope.

/// Live microphone metering
pub mod capture;
/// Buffer level measurement
pub mod level;
/// File-backed and synthetic sources
pub mod replay;

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{Config, MeterConfig, MeterSourceKind};
use crate::icon::IconEvent;
use capture::MicrophoneMeter;
use replay::WavClip;

/// Switches a meter source on and off with the recording state
#[cfg_attr(test, mockall::automock)]
pub trait MeterControl {
    /// Start (`true`) or stop (`false`) producing readings
    ///
    /// # Errors
    /// Returns error if the underlying device refuses the change
    fn set_active(&mut self, active: bool) -> Result<()>;
}

/// Running meter source; dropping it stops metering
///
/// Every source starts inactive and emits nothing until switched on.
pub enum MeterHandle {
    /// cpal stream on the default input device
    Microphone(MicrophoneMeter),
    /// Background task (WAV replay or synthetic)
    Task {
        /// The spawned source
        handle: JoinHandle<()>,
        /// Shared gate read by the task before each reading
        active: Arc<AtomicBool>,
    },
}

impl MeterControl for MeterHandle {
    fn set_active(&mut self, active: bool) -> Result<()> {
        match self {
            Self::Microphone(meter) => meter.set_active(active),
            Self::Task { active: gate, .. } => {
                gate.store(active, Ordering::Relaxed);
                Ok(())
            }
        }
    }
}

impl Drop for MeterHandle {
    fn drop(&mut self) {
        if let Self::Task { handle, .. } = self {
            handle.abort();
        }
    }
}

/// Start the configured meter source
///
/// # Errors
/// Returns error if the microphone cannot be opened or the WAV file is unusable
pub fn start(config: &MeterConfig, events: mpsc::Sender<IconEvent>) -> Result<MeterHandle> {
    let period = Duration::from_millis(config.interval_ms.max(1));
    match config.source {
        MeterSourceKind::Microphone => {
            let meter = MicrophoneMeter::start(events)?;
            info!(device = meter.device_name(), "meter source: microphone");
            Ok(MeterHandle::Microphone(meter))
        }
        MeterSourceKind::Wav => {
            let raw = config
                .wav_path
                .as_deref()
                .context("meter.wav_path is required for the wav source")?;
            let path = Config::expand_path(raw)?;
            let clip = WavClip::open(&path)?;
            let levels = clip.levels(period)?;
            info!(path = %path.display(), chunks = levels.len(), "meter source: wav");
            let active = Arc::new(AtomicBool::new(false));
            let handle = replay::spawn_replay(levels, period, Arc::clone(&active), events);
            Ok(MeterHandle::Task { handle, active })
        }
        MeterSourceKind::Synthetic => {
            info!(interval_ms = config.interval_ms, "meter source: synthetic");
            let active = Arc::new(AtomicBool::new(false));
            let handle = replay::spawn_synthetic(period, Arc::clone(&active), events);
            Ok(MeterHandle::Task { handle, active })
        }
    }
}
