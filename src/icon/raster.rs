use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

use super::geometry::{Bar, CANVAS_SIZE};

/// Logical edge of the menu-bar icon in points
pub const LOGICAL_SIZE: u32 = 22;
/// Backing scale factor of the raster
pub const SCALE: u32 = 2;
/// Physical edge of the raster in pixels
pub const PIXEL_SIZE: u32 = LOGICAL_SIZE * SCALE;

/// Supersampling grid per pixel edge (4x4 = 16 coverage samples)
const SUBSAMPLES: u32 = 4;

/// Left-to-right gradient stops: #3b82f6, #06b6d4, #8b5cf6
const GRADIENT: [[u8; 3]; 3] = [
    [0x3b, 0x82, 0xf6],
    [0x06, 0xb6, 0xd4],
    [0x8b, 0x5c, 0xf6],
];

/// Rendered icon frame
///
/// Holds a 44x44 RGBA raster that represents a 22x22pt image at 2x.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pixels: RgbaImage,
    is_template: bool,
}

impl IconImage {
    /// Physical raster (gradient colours, straight alpha)
    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Size in logical points; always 22x22
    #[must_use]
    pub const fn logical_size(&self) -> (u32, u32) {
        (LOGICAL_SIZE, LOGICAL_SIZE)
    }

    /// Size in physical pixels; always 44x44
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Whether the host should tint this image (menu-bar template)
    #[must_use]
    pub const fn is_template(&self) -> bool {
        self.is_template
    }

    /// Monochrome representation: black pixels carrying only the coverage alpha
    #[must_use]
    pub fn template_mask(&self) -> RgbaImage {
        let mut mask = self.pixels.clone();
        for pixel in mask.pixels_mut() {
            pixel.0 = [0, 0, 0, pixel.0[3]];
        }
        mask
    }

    /// Write the physical raster as PNG
    ///
    /// # Errors
    /// Returns error if the parent directory cannot be created or encoding fails
    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create frame directory")?;
        }
        self.pixels
            .save(path)
            .with_context(|| format!("failed to write PNG to {}", path.display()))
    }
}

/// Colour of the gradient at horizontal position `t` in `0.0..=1.0`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=255
fn gradient_at(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let (from, to, local) = if t <= 0.5 {
        (GRADIENT[0], GRADIENT[1], t * 2.0)
    } else {
        (GRADIENT[1], GRADIENT[2], (t - 0.5) * 2.0)
    };
    let channel = |i: usize| {
        let (from, to) = (f64::from(from[i]), f64::from(to[i]));
        (to - from).mul_add(local, from).round().clamp(0.0, 255.0) as u8
    };
    [channel(0), channel(1), channel(2)]
}

/// Point-in-rounded-rectangle test with corner radius `width / 2`
fn contains(bar: &Bar, px: f64, py: f64) -> bool {
    let left = bar.x;
    let right = bar.x + bar.width;
    let top = bar.top();
    let bottom = top + bar.computed_height;
    if px < left || px > right || py < top || py > bottom {
        return false;
    }

    let radius = (bar.width / 2.0).min(bar.computed_height / 2.0);
    let cx = px.clamp(left + radius, right - radius);
    let cy = py.clamp(top + radius, bottom - radius);
    let (dx, dy) = (px - cx, py - cy);
    dx.mul_add(dx, dy * dy) <= radius * radius
}

/// Rasterize the bars into a 2x template frame
///
/// Anything outside the canvas is clipped.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn rasterize(bars: &[Bar], opacity: f64) -> IconImage {
    let opacity = opacity.clamp(0.0, 1.0);
    let pixel_scale = CANVAS_SIZE / f64::from(PIXEL_SIZE);
    let step = 1.0 / f64::from(SUBSAMPLES);
    let samples_per_pixel = f64::from(SUBSAMPLES * SUBSAMPLES);

    let pixels = RgbaImage::from_fn(PIXEL_SIZE, PIXEL_SIZE, |x, y| {
        let mut hits = 0_u32;
        for sy in 0..SUBSAMPLES {
            for sx in 0..SUBSAMPLES {
                let px = (f64::from(sx) + 0.5).mul_add(step, f64::from(x)) * pixel_scale;
                let py = (f64::from(sy) + 0.5).mul_add(step, f64::from(y)) * pixel_scale;
                if bars.iter().any(|bar| contains(bar, px, py)) {
                    hits += 1;
                }
            }
        }

        if hits == 0 {
            return Rgba([0, 0, 0, 0]);
        }

        let coverage = f64::from(hits) / samples_per_pixel;
        let [r, g, b] = gradient_at((f64::from(x) + 0.5) / f64::from(PIXEL_SIZE));
        let alpha = (coverage * opacity * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba([r, g, b, alpha])
    });

    IconImage {
        pixels,
        is_template: true,
    }
}
