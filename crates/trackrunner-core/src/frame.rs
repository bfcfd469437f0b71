//! Render snapshots for an external renderer
//!
//! Frames are read-only views: nothing a renderer does with them flows back
//! into the simulation.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use trackrunner_track::TrackSurface;

use crate::vehicle::Vehicle;

/// One vehicle as drawn on screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleFrame {
    pub position: Vec2,
    pub heading: f32,
    pub size: f32,
    pub alive: bool,
    /// Where each sensor ray stops
    pub sensor_endpoints: Vec<Vec2>,
}

impl VehicleFrame {
    pub fn capture<T: TrackSurface + ?Sized>(vehicle: &Vehicle, track: &T) -> Self {
        Self {
            position: vehicle.position,
            heading: vehicle.heading,
            size: vehicle.config().size,
            alive: vehicle.alive,
            sensor_endpoints: vehicle.sensor_endpoints(track),
        }
    }
}

/// Whole population at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub generation: u32,
    /// Tick within the current generation
    pub tick: u64,
    pub vehicles: Vec<VehicleFrame>,
}

impl RenderFrame {
    pub fn capture<'a, T, I>(generation: u32, tick: u64, vehicles: I, track: &T) -> Self
    where
        T: TrackSurface + ?Sized,
        I: IntoIterator<Item = &'a Vehicle>,
    {
        Self {
            generation,
            tick,
            vehicles: vehicles
                .into_iter()
                .map(|v| VehicleFrame::capture(v, track))
                .collect(),
        }
    }

    pub fn alive_count(&self) -> usize {
        self.vehicles.iter().filter(|v| v.alive).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::VehicleConfig;
    use trackrunner_track::TrackLayout;

    #[test]
    fn test_capture_frame() {
        let track = TrackLayout::classic();
        let mut crashed = Vehicle::new(Vec2::new(50.0, 50.0), 0.0, VehicleConfig::learner());
        crashed.alive = false;
        let vehicles = vec![
            Vehicle::new(Vec2::new(150.0, 150.0), 0.0, VehicleConfig::learner()),
            crashed,
        ];

        let frame = RenderFrame::capture(3, 17, &vehicles, &track);
        assert_eq!(frame.generation, 3);
        assert_eq!(frame.tick, 17);
        assert_eq!(frame.vehicles.len(), 2);
        assert_eq!(frame.alive_count(), 1);
        assert_eq!(frame.vehicles[0].sensor_endpoints.len(), 3);
        assert_eq!(frame.vehicles[0].size, 20.0);
    }

    #[test]
    fn test_frame_serializes() {
        let track = TrackLayout::classic();
        let vehicles = [Vehicle::new(Vec2::new(150.0, 150.0), 0.0, VehicleConfig::learner())];
        let frame = RenderFrame::capture(1, 0, &vehicles, &track);

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["generation"], 1);
        assert_eq!(json["vehicles"][0]["alive"], true);
        assert!(json["vehicles"][0]["sensor_endpoints"].is_array());
    }
}
