//! Animated waveform status icon
//!
//! [`WaveIcon`] owns the animation phase and the latest meter sample and keeps
//! one rendered frame. Every tick or input change re-renders synchronously.

pub mod geometry;
/// Supersampled rasterizer and the rendered frame type
pub mod raster;

use tracing::trace;

pub use geometry::{Bar, MeterSample, BAR_COUNT};
pub use raster::IconImage;

/// Inputs that can change what the icon shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IconEvent {
    /// Periodic animation tick
    Tick,
    /// New meter reading
    Meter {
        average_power: f64,
        peak_power: f64,
    },
    /// Recording started or stopped
    Recording(bool),
    /// Flip the recording state (menu action)
    ToggleRecording,
    /// Stop the icon loop
    Shutdown,
}

/// Tunables for the animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconStyle {
    /// Phase advance per tick
    pub phase_step: f64,
    /// Opacity while recording
    pub recording_opacity: f64,
    /// Opacity while idle
    pub idle_opacity: f64,
}

impl Default for IconStyle {
    fn default() -> Self {
        Self {
            phase_step: 0.15,
            recording_opacity: 1.0,
            idle_opacity: 0.7,
        }
    }
}

/// Renderer for the animated menu-bar icon
#[derive(Debug, Clone)]
pub struct WaveIcon {
    style: IconStyle,
    phase: f64,
    sample: MeterSample,
    bars: [Bar; BAR_COUNT],
    image: IconImage,
}

impl WaveIcon {
    /// Create a renderer at phase 0 with a silent, idle sample
    #[must_use]
    pub fn new(style: IconStyle) -> Self {
        let sample = MeterSample::idle();
        let bars = geometry::layout(0.0, &sample);
        let image = raster::rasterize(&bars, style.idle_opacity);
        Self {
            style,
            phase: 0.0,
            sample,
            bars,
            image,
        }
    }

    /// Current animation phase
    #[must_use]
    pub const fn phase(&self) -> f64 {
        self.phase
    }

    /// Latest meter sample
    #[must_use]
    pub const fn sample(&self) -> MeterSample {
        self.sample
    }

    /// Bars of the current frame
    #[must_use]
    pub const fn bars(&self) -> &[Bar; BAR_COUNT] {
        &self.bars
    }

    /// Current frame
    #[must_use]
    pub const fn image(&self) -> &IconImage {
        &self.image
    }

    /// Advance the animation by one step and re-render
    pub fn tick(&mut self) {
        self.phase += self.style.phase_step;
        self.render();
    }

    /// Update meter levels; re-renders only when a value changed
    pub fn set_meter(&mut self, average_power: f64, peak_power: f64) -> bool {
        let unchanged = self.sample.average_power.to_bits() == average_power.to_bits()
            && self.sample.peak_power.to_bits() == peak_power.to_bits();
        if unchanged {
            return false;
        }
        self.sample.average_power = average_power;
        self.sample.peak_power = peak_power;
        self.render();
        true
    }

    /// Update recording state; re-renders only when it changed
    pub fn set_recording(&mut self, is_recording: bool) -> bool {
        if self.sample.is_recording == is_recording {
            return false;
        }
        self.sample.is_recording = is_recording;
        self.render();
        true
    }

    /// Apply an event, returning whether a new frame was produced
    pub fn apply(&mut self, event: IconEvent) -> bool {
        match event {
            IconEvent::Tick => {
                self.tick();
                true
            }
            IconEvent::Meter {
                average_power,
                peak_power,
            } => self.set_meter(average_power, peak_power),
            IconEvent::Recording(is_recording) => self.set_recording(is_recording),
            IconEvent::ToggleRecording => self.set_recording(!self.sample.is_recording),
            IconEvent::Shutdown => false,
        }
    }

    fn render(&mut self) {
        self.bars = geometry::layout(self.phase, &self.sample);
        let opacity = if self.sample.is_recording {
            self.style.recording_opacity
        } else {
            self.style.idle_opacity
        };
        self.image = raster::rasterize(&self.bars, opacity);
        trace!(phase = self.phase, recording = self.sample.is_recording, "icon rendered");
    }
}

impl Default for WaveIcon {
    fn default() -> Self {
        Self::new(IconStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_icon_starts_idle_at_phase_zero() {
        let icon = WaveIcon::default();
        assert!(icon.phase().abs() < f64::EPSILON);
        assert_eq!(icon.sample(), MeterSample::idle());
        assert_eq!(icon.image().logical_size(), (22, 22));
    }

    #[test]
    fn test_tick_advances_phase() {
        let mut icon = WaveIcon::default();
        for _ in 0..10 {
            icon.tick();
        }
        assert!((icon.phase() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_tick_changes_frame() {
        let mut icon = WaveIcon::default();
        let before = icon.bars()[0].computed_height;
        icon.tick();
        assert!((icon.bars()[0].computed_height - before).abs() > 1e-6);
    }

    #[test]
    fn test_set_meter_only_renders_on_change() {
        let mut icon = WaveIcon::default();
        assert!(icon.set_meter(0.5, 0.6));
        assert!(!icon.set_meter(0.5, 0.6));
        assert!(icon.set_meter(0.5, 0.7));
    }

    #[test]
    fn test_set_recording_only_renders_on_change() {
        let mut icon = WaveIcon::default();
        assert!(!icon.set_recording(false));
        assert!(icon.set_recording(true));
        assert!(icon.sample().is_recording);
    }

    #[test]
    fn test_meter_affects_bars_only_while_recording() {
        let mut icon = WaveIcon::default();
        let idle_heights: Vec<f64> = icon.bars().iter().map(|b| b.computed_height).collect();
        icon.set_meter(1.0, 1.0);
        let still_idle: Vec<f64> = icon.bars().iter().map(|b| b.computed_height).collect();
        assert_eq!(idle_heights, still_idle);

        icon.set_recording(true);
        let tallest = icon.bars()[1].computed_height;
        assert!(tallest > 18.0 * 2.0, "got {tallest}");
    }

    #[test]
    fn test_recording_frame_is_more_opaque() {
        let mut icon = WaveIcon::default();
        let idle_alpha = icon.image().pixels().pixels().map(|p| p.0[3]).max();
        icon.set_recording(true);
        let recording_alpha = icon.image().pixels().pixels().map(|p| p.0[3]).max();
        assert!(recording_alpha > idle_alpha);
    }

    #[test]
    fn test_apply_dispatches_events() {
        let mut icon = WaveIcon::default();
        assert!(icon.apply(IconEvent::Tick));
        assert!(icon.apply(IconEvent::ToggleRecording));
        assert!(icon.sample().is_recording);
        assert!(icon.apply(IconEvent::Meter {
            average_power: 0.3,
            peak_power: 0.9,
        }));
        assert!(!icon.apply(IconEvent::Recording(true)));
        assert!(!icon.apply(IconEvent::Shutdown));
    }

    #[test]
    fn test_out_of_range_input_still_yields_icon() {
        let mut icon = WaveIcon::default();
        icon.set_recording(true);
        icon.set_meter(1e9, -1e9);
        assert_eq!(icon.image().pixel_size(), (44, 44));
        icon.set_meter(f64::NAN, f64::INFINITY);
        assert_eq!(icon.image().pixel_size(), (44, 44));
    }
}
