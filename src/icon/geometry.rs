//! Bar geometry for the waveform icon.
//!
//! Heights are a pure function of the animation phase and the current meter
//! sample. Nothing here holds state.

/// Physical canvas edge in pixels (2x of the 22pt logical icon)
pub const CANVAS_SIZE: f64 = 44.0;
/// Bar width in canvas pixels
pub const BAR_WIDTH: f64 = 3.0;
/// Horizontal distance between the left edges of neighbouring bars
pub const BAR_SPACING: f64 = 4.0;
/// Resting heights of the five bars, left to right
pub const BASE_HEIGHTS: [f64; 5] = [12.0, 18.0, 9.0, 15.0, 6.0];
/// Number of bars drawn
pub const BAR_COUNT: usize = BASE_HEIGHTS.len();

/// Instantaneous meter reading plus recording state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterSample {
    /// Average power, nominally `0.0..=1.0`
    pub average_power: f64,
    /// Peak power, nominally `0.0..=1.0`
    pub peak_power: f64,
    /// Whether a recording is in progress
    pub is_recording: bool,
}

impl MeterSample {
    /// Sample for a silent, non-recording state
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            average_power: 0.0,
            peak_power: 0.0,
            is_recording: false,
        }
    }
}

/// One laid-out bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Position from the left, `0..BAR_COUNT`
    pub index: usize,
    /// Resting height from [`BASE_HEIGHTS`]
    pub base_height: f64,
    /// Height for the current phase and sample
    pub computed_height: f64,
    /// Left edge in canvas pixels
    pub x: f64,
    /// Width in canvas pixels
    pub width: f64,
}

impl Bar {
    /// Top edge when centered on the canvas midline (may be negative)
    #[must_use]
    pub fn top(&self) -> f64 {
        CANVAS_SIZE / 2.0 - self.computed_height / 2.0
    }
}

/// Clamp to `0.0..=1.0`, treating NaN as silence
fn unit_clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Height of bar `index` for the given phase and sample
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::suboptimal_flops)] // index < BAR_COUNT
pub fn animated_height(base_height: f64, index: usize, phase: f64, sample: &MeterSample) -> f64 {
    let offset = index as f64;

    if !sample.is_recording {
        let idle_phase = phase + offset * 0.3;
        let idle_multiplier = 1.0 + 0.2 * idle_phase.sin();
        return base_height * idle_multiplier;
    }

    let avg = unit_clamp(sample.average_power);
    let peak = unit_clamp(sample.peak_power);

    let bar_phase = phase + offset * 0.4;
    let wave_effect = bar_phase.sin() * 0.3;

    let effective_level = (avg * avg).max(peak * 0.8);
    let level_multiplier = 1.0 + effective_level * 1.5 + wave_effect;

    (base_height * 0.5).max(base_height * level_multiplier)
}

/// Left edge of the first bar so the group sits centered on the canvas
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centered_start_x() -> f64 {
    let total_width = (BAR_COUNT - 1) as f64 * BAR_SPACING + BAR_WIDTH;
    (CANVAS_SIZE - total_width) / 2.0
}

/// Lay out all five bars for the given phase and sample
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn layout(phase: f64, sample: &MeterSample) -> [Bar; BAR_COUNT] {
    let start_x = centered_start_x();
    std::array::from_fn(|index| {
        let base_height = BASE_HEIGHTS[index];
        Bar {
            index,
            base_height,
            computed_height: animated_height(base_height, index, phase, sample),
            x: (index as f64).mul_add(BAR_SPACING, start_x),
            width: BAR_WIDTH,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn recording(avg: f64, peak: f64) -> MeterSample {
        MeterSample {
            average_power: avg,
            peak_power: peak,
            is_recording: true,
        }
    }

    #[test]
    fn test_recording_height_never_below_half_base() {
        let powers = [-10.0, -1.0, -0.2, 0.0, 0.3, 0.5, 1.0, 2.0, 10.0];
        for &avg in &powers {
            for &peak in &powers {
                for step in 0..200 {
                    let phase = f64::from(step) * 0.15;
                    for (index, &base) in BASE_HEIGHTS.iter().enumerate() {
                        let h = animated_height(base, index, phase, &recording(avg, peak));
                        assert!(
                            h >= base * 0.5 - EPS,
                            "height {h} below floor for base {base} (avg={avg}, peak={peak})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_idle_height_oscillates_within_twenty_percent() {
        let idle = MeterSample::idle();
        for (index, &base) in BASE_HEIGHTS.iter().enumerate() {
            let mut min = f64::MAX;
            let mut max = f64::MIN;
            for step in 0..=1000 {
                let phase = f64::from(step) * std::f64::consts::TAU / 1000.0;
                let h = animated_height(base, index, phase, &idle);
                assert!(h >= base * 0.8 - EPS && h <= base * 1.2 + EPS);
                min = min.min(h);
                max = max.max(h);
            }
            // A full period reaches both extremes
            assert!((min - base * 0.8).abs() < 1e-3);
            assert!((max - base * 1.2).abs() < 1e-3);
        }
    }

    #[test]
    fn test_idle_ignores_meter_values() {
        let loud_idle = MeterSample {
            average_power: 1.0,
            peak_power: 1.0,
            is_recording: false,
        };
        let h1 = animated_height(12.0, 0, 1.3, &loud_idle);
        let h2 = animated_height(12.0, 0, 1.3, &MeterSample::idle());
        assert!((h1 - h2).abs() < EPS);
    }

    #[test]
    fn test_height_is_pure() {
        let sample = recording(0.42, 0.77);
        let a = animated_height(15.0, 3, 7.25, &sample);
        let b = animated_height(15.0, 3, 7.25, &sample);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_silent_recording_reduces_to_wave_effect() {
        let silent = recording(0.0, 0.0);
        for (index, &base) in BASE_HEIGHTS.iter().enumerate() {
            let phase = 2.0;
            #[allow(clippy::cast_precision_loss)]
            let wave = (phase + index as f64 * 0.4).sin() * 0.3;
            let h = animated_height(base, index, phase, &silent);
            assert!((h - base * (1.0 + wave)).abs() < EPS);
            assert!(h >= base * 0.5);
        }
    }

    #[test]
    fn test_full_scale_scenario() {
        let h = animated_height(18.0, 1, 0.0, &recording(1.0, 1.0));
        let expected = 18.0 * (2.5 + 0.4_f64.sin() * 0.3);
        assert!((h - expected).abs() < EPS);
        assert!((h - 47.10).abs() < 0.01, "got {h}");
    }

    #[test]
    fn test_peak_dominates_when_louder() {
        // avg^2 = 0.04 vs peak*0.8 = 0.4
        let h = animated_height(10.0, 0, 0.0, &recording(0.2, 0.5));
        assert!((h - 10.0 * 1.6).abs() < EPS);
    }

    #[test]
    fn test_nan_power_treated_as_silence() {
        let nan = recording(f64::NAN, f64::NAN);
        let h = animated_height(12.0, 2, 0.5, &nan);
        let silent = animated_height(12.0, 2, 0.5, &recording(0.0, 0.0));
        assert!((h - silent).abs() < EPS);
    }

    #[test]
    fn test_layout_is_centered() {
        let bars = layout(0.0, &MeterSample::idle());
        assert_eq!(bars.len(), 5);
        assert!((bars[0].x - 12.5).abs() < EPS);
        assert!((bars[4].x - 28.5).abs() < EPS);

        let left_margin = bars[0].x;
        let right_margin = CANVAS_SIZE - (bars[4].x + bars[4].width);
        assert!((left_margin - right_margin).abs() < EPS);

        for pair in bars.windows(2) {
            assert!((pair[1].x - pair[0].x - BAR_SPACING).abs() < EPS);
        }
    }

    #[test]
    fn test_layout_carries_base_heights() {
        let bars = layout(3.0, &recording(0.5, 0.5));
        for (i, bar) in bars.iter().enumerate() {
            assert_eq!(bar.index, i);
            assert!((bar.base_height - BASE_HEIGHTS[i]).abs() < EPS);
            assert!((bar.width - BAR_WIDTH).abs() < EPS);
        }
    }

    #[test]
    fn test_bar_top_centers_on_midline() {
        let bar = Bar {
            index: 0,
            base_height: 12.0,
            computed_height: 10.0,
            x: 0.0,
            width: BAR_WIDTH,
        };
        assert!((bar.top() - 17.0).abs() < EPS);
    }
}
