use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::level::Level;
use super::MeterControl;
use crate::icon::IconEvent;

/// Trait for controlling audio stream lifecycle
trait StreamControl {
    /// Resume audio stream (activate microphone)
    fn play(&self) -> Result<()>;
    /// Pause audio stream (deactivate microphone)
    fn pause(&self) -> Result<()>;
}

/// CPAL stream wrapper implementing `StreamControl`
struct CpalStreamControl {
    stream: cpal::Stream,
}

impl StreamControl for CpalStreamControl {
    fn play(&self) -> Result<()> {
        self.stream.play().context("failed to resume audio stream")
    }

    fn pause(&self) -> Result<()> {
        self.stream.pause().context("failed to pause audio stream")
    }
}

/// Forwards a level into the icon queue, dropping it when the queue is full
fn forward_level(events: &mpsc::Sender<IconEvent>, level: Level, dropped: &AtomicU64) {
    let event = IconEvent::Meter {
        average_power: level.average_power,
        peak_power: level.peak_power,
    };
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            // A newer reading follows within one buffer; losing this one is harmless
            dropped.fetch_add(1, Ordering::Relaxed);
        }
        Err(TrySendError::Closed(_)) => {
            debug!("icon queue closed, meter reading discarded");
        }
    }
}

/// Live meter on the default input device
///
/// The stream callback measures every buffer and pushes the level into the
/// icon queue. The stream starts paused and only runs while recording.
/// Dropping this value stops the stream.
pub struct MicrophoneMeter {
    stream_control: Box<dyn StreamControl>,
    dropped: Arc<AtomicU64>,
    device_name: String,
}

impl MicrophoneMeter {
    /// Open the default input device with the stream paused
    ///
    /// # Errors
    /// Returns error if no input device is available or the stream cannot be built
    pub fn start(events: mpsc::Sender<IconEvent>) -> Result<Self> {
        info!("initializing microphone meter");

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no input device available")?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());
        info!("using input device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .context("failed to get default input config")?;
        let channels = supported_config.channels();
        info!(channels, "device config");

        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_clone = Arc::clone(&dropped);

        let stream_config = supported_config.into();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let level = Level::measure(data, channels);
                    forward_level(&events, level, &dropped_clone);
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                },
                None,
            )
            .context("failed to build input stream")?;

        // Start the stream and immediately pause it (mic inactive until recording)
        let stream_control = CpalStreamControl { stream };
        stream_control.play()?;
        stream_control.pause()?;
        info!("microphone meter initialized (paused)");

        Ok(Self {
            stream_control: Box::new(stream_control),
            dropped,
            device_name,
        })
    }

    /// Name reported by the input device
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Readings discarded because the icon queue was full
    #[must_use]
    pub fn dropped_readings(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Suspend metering (microphone off)
    ///
    /// # Errors
    /// Returns error if the stream cannot be paused
    pub fn pause(&self) -> Result<()> {
        self.stream_control.pause()
    }

    /// Resume metering
    ///
    /// # Errors
    /// Returns error if the stream cannot be resumed
    pub fn resume(&self) -> Result<()> {
        self.stream_control.play()
    }
}

impl MeterControl for MicrophoneMeter {
    fn set_active(&mut self, active: bool) -> Result<()> {
        if active {
            self.resume()?;
            debug!("microphone meter resumed");
        } else {
            self.pause()?;
            debug!("microphone meter paused");
        }
        Ok(())
    }
}

impl Drop for MicrophoneMeter {
    fn drop(&mut self) {
        if let Err(e) = self.stream_control.pause() {
            tracing::error!("failed to stop microphone meter: {}", e);
        }
        let dropped = self.dropped_readings();
        if dropped > 0 {
            info!(dropped, "microphone meter stopped");
        }
    }
}
