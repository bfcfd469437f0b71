//! Track geometry for trackrunner
//!
//! This crate implements:
//! - Axis-aligned rectangle primitives with strict containment
//! - Track layouts (outer bounds, one obstacle, finish zone) and presets
//! - A pixel-sampled track mask as an alternative backing
//! - The `TrackSurface` trait that vehicles and sensors query

pub mod geometry;
pub mod layout;
pub mod raster;

pub use geometry::Rect;
pub use layout::{FinishZone, TrackLayout, TrackSurface};
pub use raster::TrackMask;

/// Errors raised while building or validating a track
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("layout '{layout}': obstacle is not strictly inside the outer bounds")]
    ObstacleOutsideBounds { layout: String },

    #[error("layout '{layout}': finish zone overlaps the obstacle")]
    FinishOverlapsObstacle { layout: String },

    #[error("raster is {width}x{height} but buffer holds {actual} pixels")]
    RasterSize {
        width: usize,
        height: usize,
        actual: usize,
    },
}
