/// Floor of the meter scale; anything quieter reads as 0
const FLOOR_DB: f32 = -60.0;

/// Normalized audio level of one buffer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Level {
    /// RMS level mapped to `0.0..=1.0`
    pub average_power: f64,
    /// Absolute peak mapped to `0.0..=1.0`
    pub peak_power: f64,
}

impl Level {
    /// Measure an interleaved buffer with `channels` channels
    ///
    /// Channels are averaged to mono before measuring. An empty buffer is silence.
    #[must_use]
    pub fn measure(samples: &[f32], channels: u16) -> Self {
        let channels = usize::from(channels.max(1));
        let mut sum_squares = 0.0_f64;
        let mut peak = 0.0_f32;
        let mut frames = 0_usize;

        for frame in samples.chunks(channels) {
            #[allow(clippy::cast_precision_loss)] // channel counts are tiny
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            if !mono.is_finite() {
                continue;
            }
            sum_squares += f64::from(mono) * f64::from(mono);
            peak = peak.max(mono.abs());
            frames += 1;
        }

        if frames == 0 {
            return Self::default();
        }

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let rms = (sum_squares / frames as f64).sqrt() as f32;

        Self {
            average_power: f64::from(normalize_db(rms)),
            peak_power: f64::from(normalize_db(peak)),
        }
    }
}

/// Map a linear amplitude to `0.0..=1.0` over -60 dB..0 dB
#[must_use]
pub fn normalize_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * linear.log10();
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0)
}
