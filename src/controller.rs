//! Icon event loop
//!
//! Animation ticks, meter readings and recording changes all arrive on one
//! mpsc queue and are applied in order. Each event that changes the picture
//! produces one frame for the surface.

use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::audio::MeterControl;
use crate::icon::{IconEvent, IconStyle, WaveIcon};
use crate::surface::IconSurface;

/// State owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppState {
    /// Whether a recording is in progress
    pub recording: bool,
    /// Frames handed to the surface, including failed ones
    pub frames_rendered: u64,
    /// Frames the surface rejected
    pub present_failures: u64,
}

/// Send `Tick` every `period` until the queue closes
pub fn spawn_ticker(period: Duration, events: mpsc::Sender<IconEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // A late tick is not worth catching up on
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if events.send(IconEvent::Tick).await.is_err() {
                debug!("icon queue closed, ticker stopped");
                break;
            }
        }
    })
}

/// Drives a [`WaveIcon`] from the event queue onto a surface
pub struct IconController {
    icon: WaveIcon,
    surface: Box<dyn IconSurface>,
    events: mpsc::Receiver<IconEvent>,
    meter: Option<Box<dyn MeterControl>>,
    state: AppState,
}

impl IconController {
    /// Build a controller in the idle state
    ///
    /// Nothing is presented until [`Self::start`] or [`Self::run`].
    #[must_use]
    pub fn new(
        style: IconStyle,
        surface: Box<dyn IconSurface>,
        events: mpsc::Receiver<IconEvent>,
    ) -> Self {
        Self {
            icon: WaveIcon::new(style),
            surface,
            events,
            meter: None,
            state: AppState::default(),
        }
    }

    /// Gate `meter` on the recording state
    ///
    /// The meter is switched off now and toggled on every recording change.
    #[must_use]
    pub fn with_meter(mut self, mut meter: Box<dyn MeterControl>) -> Self {
        if let Err(e) = meter.set_active(self.state.recording) {
            warn!("failed to set initial meter state: {:#}", e);
        }
        self.meter = Some(meter);
        self
    }

    /// Snapshot of the controller state
    #[must_use]
    pub const fn state(&self) -> AppState {
        self.state
    }

    /// The renderer being driven
    #[must_use]
    pub const fn icon(&self) -> &WaveIcon {
        &self.icon
    }

    /// Process events until `Shutdown` arrives or every sender is gone
    pub async fn run(&mut self) -> AppState {
        self.start();

        while let Some(event) = self.events.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        self.finish()
    }

    /// Present the initial frame
    pub fn start(&mut self) {
        info!("icon loop starting");
        self.publish();
    }

    /// Apply every queued event without waiting
    ///
    /// Returns false once `Shutdown` arrives or every sender is gone. Used
    /// when a GUI event loop owns the thread.
    pub fn drain(&mut self) -> bool {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if !self.handle(event) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Log the final counters and return them
    pub fn finish(&self) -> AppState {
        info!(
            frames = self.state.frames_rendered,
            failures = self.state.present_failures,
            "icon loop stopped"
        );
        self.state
    }

    /// Apply one event; returns false when the loop should stop
    pub fn handle(&mut self, event: IconEvent) -> bool {
        if event == IconEvent::Shutdown {
            info!("shutdown requested");
            return false;
        }

        let was_recording = self.state.recording;
        if !self.icon.apply(event) {
            return true;
        }

        let recording = self.icon.sample().is_recording;
        if recording != was_recording {
            self.state.recording = recording;
            info!(
                "recording state: {} -> {}",
                label(was_recording),
                label(recording)
            );
            if let Err(e) = self.surface.set_recording(recording) {
                warn!("failed to update surface recording state: {:#}", e);
            }
            if let Some(meter) = self.meter.as_mut() {
                if let Err(e) = meter.set_active(recording) {
                    warn!("failed to switch meter: {:#}", e);
                }
            }
        }

        self.publish();
        true
    }

    fn publish(&mut self) {
        self.state.frames_rendered += 1;
        if let Err(e) = self.surface.present(self.icon.image()) {
            self.state.present_failures += 1;
            warn!("failed to present icon frame: {:#}", e);
        }
    }
}

const fn label(recording: bool) -> &'static str {
    if recording {
        "Recording"
    } else {
        "Idle"
    }
}
