//! Track layouts: outer bounds, one interior obstacle and a finish zone
//!
//! Two built-in presets exist. Layouts are immutable once validated.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::TrackError;
use crate::geometry::Rect;

/// Drivable-area and finish queries used by vehicles and sensors
///
/// Implementations must be pure functions of position: they are called once
/// per sensor ray step, many times per tick, possibly from several threads.
pub trait TrackSurface: Send + Sync {
    /// True iff the point is drivable
    fn is_on_track(&self, x: f32, y: f32) -> bool;

    /// True iff the point lies in the finish zone
    fn is_on_finish(&self, x: f32, y: f32) -> bool;

    /// Reference point used for distance-to-finish shaping
    fn finish_point(&self) -> Vec2;

    /// Distance from a position to the finish reference point
    fn distance_to_finish(&self, position: Vec2) -> f32 {
        position.distance(self.finish_point())
    }

    /// Structural checks run before a simulation starts
    fn check_invariants(&self) -> Result<(), TrackError> {
        Ok(())
    }
}

/// Finish area of a layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FinishZone {
    /// Exact rectangle, distance is measured to its center
    Rect(Rect),
    /// Tolerant zone: within `tolerance` of `point` on both axes
    Around { point: Vec2, tolerance: f32 },
}

impl FinishZone {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.bounds().contains(x, y)
    }

    /// Reference point for distance-to-finish
    pub fn point(&self) -> Vec2 {
        match self {
            FinishZone::Rect(rect) => rect.center(),
            FinishZone::Around { point, .. } => *point,
        }
    }

    /// Rectangle covered by the zone
    pub fn bounds(&self) -> Rect {
        match self {
            FinishZone::Rect(rect) => *rect,
            FinishZone::Around { point, tolerance } => Rect::around(*point, *tolerance),
        }
    }
}

/// Track geometry: drivable outer rectangle minus one obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLayout {
    pub name: String,
    pub outer: Rect,
    pub obstacle: Rect,
    pub finish: FinishZone,
    /// Canvas size the layout was designed for
    pub canvas: Vec2,
}

impl TrackLayout {
    /// Rectangular loop around a small central block, finish at the
    /// bottom-right corner (tolerant point zone)
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            outer: Rect::from_origin_size(100.0, 100.0, 600.0, 400.0),
            obstacle: Rect::from_origin_size(300.0, 250.0, 200.0, 100.0),
            finish: FinishZone::Around {
                point: Vec2::new(680.0, 480.0),
                tolerance: 20.0,
            },
            canvas: Vec2::new(800.0, 600.0),
        }
    }

    /// Narrow ring around a large central block, finish rectangle in the
    /// bottom-right corner
    pub fn ring() -> Self {
        Self {
            name: "ring".to_string(),
            outer: Rect::from_origin_size(100.0, 100.0, 600.0, 400.0),
            obstacle: Rect::from_origin_size(200.0, 200.0, 400.0, 200.0),
            finish: FinishZone::Rect(Rect::from_origin_size(650.0, 450.0, 50.0, 50.0)),
            canvas: Vec2::new(800.0, 600.0),
        }
    }

    /// Check the layout invariants: the obstacle lies strictly inside the
    /// outer bounds and the finish zone does not overlap the obstacle
    pub fn validate(&self) -> Result<(), TrackError> {
        if !self.outer.contains_rect(&self.obstacle) {
            return Err(TrackError::ObstacleOutsideBounds {
                layout: self.name.clone(),
            });
        }
        if self.finish.bounds().intersects(&self.obstacle) {
            return Err(TrackError::FinishOverlapsObstacle {
                layout: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Validate and return self, for builder-style construction
    pub fn validated(self) -> Result<Self, TrackError> {
        self.validate()?;
        Ok(self)
    }
}

impl TrackSurface for TrackLayout {
    fn is_on_track(&self, x: f32, y: f32) -> bool {
        self.outer.contains(x, y) && !self.obstacle.contains(x, y)
    }

    fn is_on_finish(&self, x: f32, y: f32) -> bool {
        self.finish.contains(x, y)
    }

    fn finish_point(&self) -> Vec2 {
        self.finish.point()
    }

    fn check_invariants(&self) -> Result<(), TrackError> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(TrackLayout::classic().validate().is_ok());
        assert!(TrackLayout::ring().validate().is_ok());
    }

    #[test]
    fn test_classic_on_track() {
        let track = TrackLayout::classic();

        // Corridor between outer bounds and obstacle
        assert!(track.is_on_track(150.0, 150.0));
        assert!(track.is_on_track(600.0, 300.0));

        // Inside the obstacle
        assert!(!track.is_on_track(400.0, 300.0));

        // Outside the outer bounds, including far away
        assert!(!track.is_on_track(50.0, 300.0));
        assert!(!track.is_on_track(-1.0e6, 1.0e6));
        assert!(!track.is_on_track(f32::INFINITY, 300.0));
        assert!(!track.is_on_track(f32::NAN, f32::NAN));
    }

    #[test]
    fn test_boundary_policy() {
        let track = TrackLayout::classic();

        // Outer edge is off-track
        assert!(!track.is_on_track(100.0, 300.0));
        assert!(!track.is_on_track(400.0, 500.0));

        // Obstacle edge is drivable
        assert!(track.is_on_track(300.0, 300.0));
        assert!(track.is_on_track(400.0, 250.0));
    }

    #[test]
    fn test_ring_obstacle() {
        let track = TrackLayout::ring();
        assert!(track.is_on_track(150.0, 150.0));
        assert!(!track.is_on_track(250.0, 250.0));
        assert!(track.is_on_track(650.0, 300.0));
    }

    #[test]
    fn test_finish_zones() {
        let classic = TrackLayout::classic();
        assert!(classic.is_on_finish(680.0, 480.0));
        assert!(classic.is_on_finish(665.0, 495.0));
        assert!(!classic.is_on_finish(659.0, 480.0));
        assert_eq!(classic.finish_point(), Vec2::new(680.0, 480.0));

        let ring = TrackLayout::ring();
        assert!(ring.is_on_finish(675.0, 475.0));
        assert!(!ring.is_on_finish(640.0, 475.0));
        assert_eq!(ring.finish_point(), Vec2::new(675.0, 475.0));
    }

    #[test]
    fn test_distance_to_finish() {
        let track = TrackLayout::classic();
        let d = track.distance_to_finish(Vec2::new(680.0, 380.0));
        assert!((d - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_validate_rejects_obstacle_outside_bounds() {
        let mut layout = TrackLayout::classic();
        layout.obstacle = Rect::from_origin_size(50.0, 250.0, 200.0, 100.0);
        assert!(matches!(
            layout.validate(),
            Err(TrackError::ObstacleOutsideBounds { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_finish_on_obstacle() {
        let mut layout = TrackLayout::classic();
        layout.finish = FinishZone::Around {
            point: Vec2::new(400.0, 300.0),
            tolerance: 20.0,
        };
        assert!(matches!(
            layout.validated(),
            Err(TrackError::FinishOverlapsObstacle { .. })
        ));
    }
}
