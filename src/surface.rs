use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::icon::IconImage;

/// Where rendered icon frames are shown
///
/// Use `MockIconSurface` (via `mockall`) in tests.
#[cfg_attr(test, mockall::automock)]
pub trait IconSurface {
    /// Display a freshly rendered frame
    ///
    /// # Errors
    /// Returns error if the host rejects the image
    fn present(&mut self, image: &IconImage) -> Result<()>;

    /// Reflect a recording state change (menu labels, tooltips)
    ///
    /// # Errors
    /// Returns error if the host surface cannot be updated
    fn set_recording(&mut self, _recording: bool) -> Result<()> {
        Ok(())
    }
}

/// Writes frames to a directory as `frame_000001.png`, ...
///
/// Only every `every`-th presented frame is written.
pub struct PngSurface {
    dir: PathBuf,
    every: u64,
    presented: u64,
    written: u64,
}

impl PngSurface {
    /// Sink writing into `dir`, one file per `every` frames (0 means every frame)
    ///
    /// The directory is created on the first write.
    #[must_use]
    pub fn new(dir: PathBuf, every: u64) -> Self {
        Self {
            dir,
            every: every.max(1),
            presented: 0,
            written: 0,
        }
    }

    /// Number of files written so far
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }
}

impl IconSurface for PngSurface {
    fn present(&mut self, image: &IconImage) -> Result<()> {
        let due = self.presented % self.every == 0;
        self.presented += 1;
        if !due {
            return Ok(());
        }

        self.written += 1;
        let path = self.dir.join(format!("frame_{:06}.png", self.written));
        image.save_png(&path)?;
        debug!(path = %path.display(), "frame written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::WaveIcon;

    #[test]
    fn test_png_surface_writes_every_nth_frame() {
        let dir = std::env::temp_dir().join(format!("wavebar-png-{}", std::process::id()));
        let mut surface = PngSurface::new(dir.clone(), 3);
        let mut icon = WaveIcon::default();

        for _ in 0..7 {
            surface.present(icon.image()).unwrap();
            icon.tick();
        }

        // frames 0, 3 and 6
        assert_eq!(surface.written(), 3);
        assert!(dir.join("frame_000001.png").exists());
        assert!(dir.join("frame_000003.png").exists());
        assert!(!dir.join("frame_000004.png").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_png_surface_zero_interval_writes_all() {
        let surface = PngSurface::new(PathBuf::from("/tmp"), 0);
        assert_eq!(surface.every, 1);
    }

    #[test]
    fn test_default_set_recording_is_noop() {
        let mut surface = PngSurface::new(PathBuf::from("/tmp"), 1);
        assert!(surface.set_recording(true).is_ok());
        assert_eq!(surface.written(), 0);
    }
}
