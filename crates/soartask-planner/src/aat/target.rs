/*
[INPUT]:  Refreshed task points, AAT offsets, aircraft position
[OUTPUT]: Target point per AAT turnpoint, sector corner points
[POS]:    AAT layer - places targets from normalised offsets
[UPDATE]: When target placement or offset handling changes
*/

use soartask_geo::{
    GeoPoint, angle_in_range, angle_limit_180, angle_limit_360, destination, distance_bearing,
    half_angle, reciprocal,
};
use tracing::debug;

use super::region::{find_inside_distance, in_aat_region};
use crate::task::{AatKind, Context, MAX_TASK_POINTS, TaskPoint, TaskState};

/// Bearing and distance of the target from its waypoint, derived from the
/// point's offsets.
fn target_line(point: &TaskPoint) -> (f64, f64) {
    let bearing = angle_limit_360(point.bisector_bearing + point.target_offset_radial);

    match point.aat_kind {
        AatKind::Circle => (bearing, point.target_offset_radius * point.aat_circle_radius),
        AatKind::Sector => {
            let mut bearing = bearing;
            let mut range = (point.target_offset_radius + 1.0) / 2.0;

            let axis = half_angle(point.aat_start_radial, point.aat_finish_radial);
            if angle_limit_180(axis - bearing).abs() > 90.0 {
                bearing = reciprocal(bearing);
                range = 1.0 - range;
            }

            if !angle_in_range(point.aat_start_radial, point.aat_finish_radial, bearing) {
                let to_start = angle_limit_180(point.aat_start_radial - bearing).abs();
                let to_finish = angle_limit_180(point.aat_finish_radial - bearing).abs();
                bearing = if to_start < to_finish {
                    point.aat_start_radial
                } else {
                    point.aat_finish_radial
                };
            }

            (bearing, range * point.aat_sector_radius)
        }
    }
}

impl TaskPoint {
    /// Keep offsets inside their documented ranges.
    pub(crate) fn clamp_offsets(&mut self) {
        self.target_offset_radius = self.target_offset_radius.clamp(-1.0, 1.0);
        self.target_offset_radial = self.target_offset_radial.clamp(-90.0, 90.0);
    }
}

impl TaskState {
    /// Recompute every AAT target, then the isolines.
    pub(crate) fn calculate_aat_targets(&mut self, ctx: &Context<'_>) {
        if !self.settings.aat_enabled {
            return;
        }

        let locations = self.locations(ctx.waypoints);
        let occupied = self.occupied_len();

        let first = &mut self.points[0];
        first.clear_offsets();
        if let Some(location) = locations[0] {
            first.target = location;
        }

        for i in 1..occupied {
            let Some(center) = locations[i] else {
                continue;
            };
            if i + 1 >= occupied {
                self.points[i].target = center;
                continue;
            }

            let previous_target = self.points[i - 1].target;
            let aircraft = self.aircraft;
            let is_active = self.active_index == i as i32;
            let frozen = (i as i32) < self.active_index;
            let point = &mut self.points[i];

            if point.aat_kind == AatKind::Sector {
                point.aat_start =
                    destination(center, point.aat_start_radial, point.aat_sector_radius);
                point.aat_finish =
                    destination(center, point.aat_finish_radial, point.aat_sector_radius);
            }

            if frozen {
                continue;
            }

            point.clamp_offsets();
            let (bearing, range) = target_line(point);

            point.target = match aircraft {
                Some(position)
                    if is_active
                        && !point.target_locked
                        && in_aat_region(point, center, position) =>
                {
                    let track = distance_bearing(previous_target, position).1;
                    let bearing = angle_limit_360(track + point.target_offset_radial);
                    let reach = find_inside_distance(point, center, position, bearing, 0.0);
                    let scaled = (point.target_offset_radius + 1.0) / 2.0 * reach;
                    debug!(slot = i, reach, "placing target ahead of aircraft");
                    destination(position, bearing, scaled)
                }
                _ => destination(center, bearing, range),
            };
            self.target_modified = true;
        }

        self.calculate_isolines(&locations);

        if !ctx.target_editing {
            self.target_modified = false;
        }
    }

    /// Turnpoints whose offsets follow the task-wide adjustment.
    fn adjustable_slots(&self) -> impl Iterator<Item = usize> + '_ {
        let first = self.active_index.max(1) as usize;
        (first..MAX_TASK_POINTS - 1).filter(move |&i| {
            self.points[i].is_occupied()
                && self.points[i + 1].is_occupied()
                && !self.points[i].target_locked
        })
    }

    /// Average offset radius of the adjustable turnpoints.
    ///
    /// With `|desired| <= 1` every adjustable offset is moved to `desired`,
    /// targets are recomputed and the previous average is returned scaled to
    /// [0, 1]. Larger values only read the average, as a raw value in [-1, 1].
    pub(crate) fn adjust_aat_targets(&mut self, ctx: &Context<'_>, desired: f64) -> f64 {
        let slots: Vec<usize> = self.adjustable_slots().collect();

        let mut average = 0.0;
        for &i in &slots {
            let point = &mut self.points[i];
            point.target_offset_radius = point.target_offset_radius.clamp(-1.0, 1.0);
            average += point.target_offset_radius;
        }
        if !slots.is_empty() {
            average /= slots.len() as f64;
        }

        if desired.abs() > 1.0 {
            return average;
        }

        let scaled = ((desired + 1.0) / 2.0).clamp(0.0, 1.0);
        for &i in &slots {
            self.points[i].target_offset_radius = scaled * 2.0 - 1.0;
        }
        debug!(desired, turnpoints = slots.len(), "adjusted AAT offsets");

        self.calculate_aat_targets(ctx);
        (average + 1.0) / 2.0
    }

    /// Target of the active point, when there is one.
    pub fn active_target(&self) -> Option<GeoPoint> {
        self.active_slot()
            .filter(|&slot| self.points[slot].is_occupied())
            .map(|slot| self.points[slot].target)
    }
}
