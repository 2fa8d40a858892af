use soartask_geo::{GeoPoint, angle_in_range, angle_limit_360, destination, distance_bearing};

use crate::task::{AatKind, TaskPoint};

/// Binary search stops once the step shrinks to this many metres.
const SEARCH_RESOLUTION_M: f64 = 5.0;
const MAX_SEARCH_STEPS: u32 = 20;

/// Whether `position` lies inside the AAT region of `point`, centred on `center`.
pub fn in_aat_region(point: &TaskPoint, center: GeoPoint, position: GeoPoint) -> bool {
    let (distance, bearing) = distance_bearing(center, position);
    match point.aat_kind {
        AatKind::Circle => distance < point.aat_circle_radius,
        AatKind::Sector => {
            distance < point.aat_sector_radius
                && angle_in_range(
                    point.aat_start_radial,
                    point.aat_finish_radial,
                    angle_limit_360(bearing),
                )
        }
    }
}

/// Furthest distance along `bearing` from `origin` still inside the region.
///
/// Bounded binary search seeded at `start_distance`; the answer is within a
/// few metres of the true boundary for convex regions.
pub fn find_inside_distance(
    point: &TaskPoint,
    center: GeoPoint,
    origin: GeoPoint,
    bearing: f64,
    start_distance: f64,
) -> f64 {
    let mut delta = point.aat_radius();
    let mut lower = start_distance;
    let mut distance = start_distance + delta * 2.0;
    let mut steps = 0;

    loop {
        let probe = destination(origin, bearing, distance);
        if in_aat_region(point, center, probe) {
            lower = distance;
            distance += delta;
        } else {
            distance -= delta;
        }
        delta /= 2.0;

        let keep_going = delta > SEARCH_RESOLUTION_M && steps < MAX_SEARCH_STEPS;
        steps += 1;
        if !keep_going {
            break;
        }
    }

    lower
}

/// Position of `start_distance` along the inside chord, scaled to [-1, 1].
pub fn find_inside_range(
    point: &TaskPoint,
    center: GeoPoint,
    origin: GeoPoint,
    bearing: f64,
    start_distance: f64,
) -> f64 {
    let reach = find_inside_distance(point, center, origin, bearing, start_distance);
    start_distance / reach.max(1.0) * 2.0 - 1.0
}
