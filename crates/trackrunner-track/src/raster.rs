//! Pixel-sampled track backing
//!
//! Stores the track as a luminance image (one byte per pixel) and answers
//! drivable-area queries by sampling the pixel under the point. Dark pixels
//! are asphalt.

use glam::Vec2;

use crate::TrackError;
use crate::layout::{FinishZone, TrackLayout, TrackSurface};

/// Pixels darker than this are drivable
pub const ASPHALT_THRESHOLD: u8 = 50;

const ASPHALT: u8 = 0;
const GRASS: u8 = 255;

/// Luminance raster of a track
#[derive(Debug, Clone)]
pub struct TrackMask {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    finish: FinishZone,
}

impl TrackMask {
    /// Paint a layout into a raster of the given size
    ///
    /// Each pixel is classified by its center, so the raster agrees with
    /// the geometric layout everywhere except within one pixel of an edge.
    pub fn rasterize(layout: &TrackLayout, width: usize, height: usize) -> Self {
        let mut pixels = vec![GRASS; width * height];
        for y in 0..height {
            for x in 0..width {
                let cx = x as f32 + 0.5;
                let cy = y as f32 + 0.5;
                if layout.is_on_track(cx, cy) {
                    pixels[y * width + x] = ASPHALT;
                }
            }
        }

        log::debug!(
            "Rasterized track '{}' into {}x{} mask",
            layout.name,
            width,
            height
        );

        Self {
            width,
            height,
            pixels,
            finish: layout.finish,
        }
    }

    /// Rasterize at the layout's own canvas size
    pub fn from_layout(layout: &TrackLayout) -> Self {
        Self::rasterize(
            layout,
            layout.canvas.x.max(0.0) as usize,
            layout.canvas.y.max(0.0) as usize,
        )
    }

    /// Wrap an existing luminance buffer (row-major, `width * height` bytes)
    pub fn from_luminance(
        width: usize,
        height: usize,
        pixels: Vec<u8>,
        finish: FinishZone,
    ) -> Result<Self, TrackError> {
        if pixels.len() != width * height {
            return Err(TrackError::RasterSize {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            finish,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance of the pixel containing the point, if inside the image
    pub fn sample(&self, x: f32, y: f32) -> Option<u8> {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let (px, py) = (x.floor() as usize, y.floor() as usize);
        if px >= self.width || py >= self.height {
            return None;
        }
        Some(self.pixels[py * self.width + px])
    }

    /// Number of drivable pixels
    pub fn drivable_pixels(&self) -> usize {
        self.pixels
            .iter()
            .filter(|&&p| p < ASPHALT_THRESHOLD)
            .count()
    }
}

impl TrackSurface for TrackMask {
    fn is_on_track(&self, x: f32, y: f32) -> bool {
        self.sample(x, y)
            .is_some_and(|luminance| luminance < ASPHALT_THRESHOLD)
    }

    fn is_on_finish(&self, x: f32, y: f32) -> bool {
        self.finish.contains(x, y)
    }

    fn finish_point(&self) -> Vec2 {
        self.finish.point()
    }
}
