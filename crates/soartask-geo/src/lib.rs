/*
[INPUT]:  Crate modules and public geometry/waypoint definitions
[OUTPUT]: Public soartask-geo crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod angle;
pub mod earth;
pub mod waypoint;

// Re-export commonly used geometry helpers
pub use angle::{
    angle_in_range,
    angle_limit_180,
    angle_limit_360,
    bisector,
    half_angle,
    reciprocal,
};
pub use earth::{GeoPoint, destination, distance, distance_bearing, double_distance};

// Re-export waypoint database types
pub use waypoint::{Waypoint, WaypointDatabase, WaypointFlags, WaypointList};
