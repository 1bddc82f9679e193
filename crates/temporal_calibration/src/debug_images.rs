//! IntermediateImageWriter - writes per-frame detection images to disk
//!
//! Purely a debugging side channel: every failure is logged and swallowed.

use contracts::IntensityImage;
use image::{GrayImage, Luma, Rgb, RgbImage};
use nalgebra::Point2;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::line_fit::LineModel;

const PEAK_MARKER_SIZE: i64 = 6;
const SCANLINE_COLOR: u8 = 255;
const PEAK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LINE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Writes scanline and peak images for each processed frame
#[derive(Debug)]
pub struct IntermediateImageWriter {
    output_dir: PathBuf,
    failures: usize,
}

impl IntermediateImageWriter {
    /// Create the writer; returns `None` (with a warning) when the directory cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>) -> Option<Self> {
        let output_dir = output_dir.into();
        if let Err(e) = fs::create_dir_all(&output_dir) {
            warn!(
                dir = %output_dir.display(),
                error = %e,
                "cannot create intermediate image directory, images disabled"
            );
            return None;
        }
        Some(Self {
            output_dir,
            failures: 0,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of images that could not be written
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Grayscale frame with the sampled scanlines drawn white
    pub fn write_scanlines(&mut self, frame_index: usize, image: &IntensityImage, columns: &[u32]) {
        let Some(mut gray) = GrayImage::from_raw(image.width, image.height, image.pixels.to_vec())
        else {
            self.record_failure(frame_index, "pixel buffer does not match image size");
            return;
        };
        for &x in columns {
            for y in 0..image.height {
                if x < image.width {
                    gray.put_pixel(x, y, Luma([SCANLINE_COLOR]));
                }
            }
        }
        let path = self.output_dir.join(format!("scanlines_{frame_index:04}.png"));
        if let Err(e) = gray.save(&path) {
            self.record_failure(frame_index, &e.to_string());
        }
    }

    /// RGB frame with detected peaks as squares and the fitted line in blue
    pub fn write_peaks(
        &mut self,
        frame_index: usize,
        image: &IntensityImage,
        peaks: &[Point2<f64>],
        line: Option<&LineModel>,
    ) {
        let mut rgb = RgbImage::new(image.width, image.height);
        for (x, y, pixel) in rgb.enumerate_pixels_mut() {
            let v = image.get(x, y).unwrap_or(0);
            *pixel = Rgb([v, v, v]);
        }

        if let Some(line) = line {
            for x in 0..image.width {
                if let Some(y) = line.y_at(f64::from(x), 0.0) {
                    put_checked(&mut rgb, i64::from(x), y.round() as i64, LINE_COLOR);
                }
            }
        }

        for peak in peaks {
            let (cx, cy) = (peak.x.round() as i64, peak.y.round() as i64);
            let half = PEAK_MARKER_SIZE / 2;
            for dy in -half..half {
                for dx in -half..half {
                    put_checked(&mut rgb, cx + dx, cy + dy, PEAK_COLOR);
                }
            }
        }

        let path = self.output_dir.join(format!("peaks_{frame_index:04}.png"));
        if let Err(e) = rgb.save(&path) {
            self.record_failure(frame_index, &e.to_string());
        }
    }

    fn record_failure(&mut self, frame_index: usize, message: &str) {
        self.failures += 1;
        // first failure at warn, the rest at debug
        if self.failures == 1 {
            warn!(frame_index, error = message, "failed to write intermediate image");
        } else {
            debug!(frame_index, error = message, "failed to write intermediate image");
        }
    }
}

fn put_checked(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(image.width()) && y < i64::from(image.height()) {
        image.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_both_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IntermediateImageWriter::new(dir.path().join("frames")).unwrap();
        let image = IntensityImage::blank(32, 16);
        let line = LineModel::through(&Point2::new(0.0, 8.0), &Point2::new(31.0, 8.0));

        writer.write_scanlines(3, &image, &[8, 16, 24]);
        writer.write_peaks(3, &image, &[Point2::new(8.0, 8.0)], line.as_ref());

        assert!(writer.output_dir().join("scanlines_0003.png").exists());
        assert!(writer.output_dir().join("peaks_0003.png").exists());
        assert_eq!(writer.failures(), 0);
    }

    #[test]
    fn test_bad_buffer_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IntermediateImageWriter::new(dir.path()).unwrap();
        let image = IntensityImage::new(10, 10, vec![0u8; 5]);
        writer.write_scanlines(0, &image, &[1]);
        assert_eq!(writer.failures(), 1);
    }
}
