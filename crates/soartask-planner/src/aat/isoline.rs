/*
[INPUT]:  AAT targets of each turnpoint and its neighbours
[OUTPUT]: Isoline polyline per AAT turnpoint
[POS]:    AAT layer - equal task distance curves through each target
[UPDATE]: When the tracing step or probe geometry changes
*/

use soartask_geo::{GeoPoint, angle_limit_360, destination, distance, double_distance};

use super::region::in_aat_region;
use crate::task::{MAX_ISOLINES, MAX_TASK_POINTS, TaskPoint, TaskState};

/// Offset of the north and east gradient probes.
const PROBE_STEP_M: f64 = 25.0;

/// Walk both ways from the target along the curve where the dog-leg distance
/// `previous -> p -> next` stays constant, storing points while inside the region.
fn trace_isoline(
    point: &mut TaskPoint,
    center: GeoPoint,
    previous: Option<GeoPoint>,
    next: GeoPoint,
) {
    let leg = |p: GeoPoint| match previous {
        Some(previous) => double_distance(previous, p, next),
        None => distance(p, next),
    };

    let seed = point.target;
    let step = point.aat_radius() * 2.4 / MAX_ISOLINES as f64;

    point.isoline.invalidate();
    point.isoline.set(0, seed);

    let mut slot = 1;
    let mut cursor = seed;
    let mut left = false;

    loop {
        let here = leg(cursor);
        let north = leg(destination(cursor, 0.0, PROBE_STEP_M));
        let east = leg(destination(cursor, 90.0, PROBE_STEP_M));

        let mut heading = angle_limit_360((east - here).atan2(north - here).to_degrees() + 90.0);
        if left {
            heading += 180.0;
        }
        cursor = destination(cursor, heading, step);

        let mut inside = in_aat_region(point, center, cursor);
        if inside {
            point.isoline.set(slot, cursor);
            slot += 1;
        } else {
            // the skipped slot separates the two branches
            slot += 1;
            if !left && slot < MAX_ISOLINES - 2 {
                left = true;
                cursor = seed;
                inside = true;
                point.isoline.set(slot, seed);
                slot += 1;
            }
        }

        if !inside || slot >= MAX_ISOLINES {
            break;
        }
    }
}

impl TaskState {
    pub(crate) fn calculate_isolines(&mut self, locations: &[Option<GeoPoint>; MAX_TASK_POINTS]) {
        if !self.settings.aat_enabled {
            return;
        }

        let occupied = self.occupied_len();
        let first = self.active_index.max(1) as usize;
        for i in first..occupied.saturating_sub(1) {
            let Some(center) = locations[i] else {
                continue;
            };
            let previous = i.checked_sub(1).map(|p| self.points[p].target);
            let next = self.points[i + 1].target;
            trace_isoline(&mut self.points[i], center, previous, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskSettings;
    use crate::task::{AatKind, Context};
    use soartask_geo::{Waypoint, WaypointDatabase, WaypointList};

    fn setup() -> (WaypointList, TaskState) {
        let waypoints = WaypointList::new(vec![
            Waypoint::new("Start", 47.0, 11.0),
            Waypoint::new("Turn", 47.5, 11.0),
            Waypoint::new("Finish", 47.5, 11.7),
        ]);
        let settings = TaskSettings {
            aat_enabled: true,
            ..TaskSettings::default()
        };
        let mut state = TaskState::new(settings);
        for (slot, index) in [0, 1, 2].into_iter().enumerate() {
            state.points[slot].waypoint_index = index;
        }
        state.points[1].aat_kind = AatKind::Circle;
        state.points[1].aat_circle_radius = 10_000.0;
        state.refresh(&Context {
            waypoints: &waypoints,
            target_editing: false,
        });
        (waypoints, state)
    }

    #[test]
    fn isoline_starts_at_target_and_stays_inside() {
        let (waypoints, state) = setup();
        let point = &state.points[1];
        let center = waypoints.location(1).expect("turn");

        assert!(point.isoline.valid[0]);
        assert_eq!(point.isoline.points[0], point.target);
        assert!(point.isoline.valid_count() >= 10);
        assert!(point.isoline.valid_count() < MAX_ISOLINES);
        for p in point.isoline.valid_points() {
            assert!(distance(center, p) < 10_000.0);
        }
    }

    #[test]
    fn branches_are_separated_by_an_invalid_slot() {
        let (_, state) = setup();
        let isoline = &state.points[1].isoline;
        let gap = isoline
            .valid
            .iter()
            .position(|valid| !valid)
            .expect("gap between branches");
        assert!(gap > 1);
        assert!(isoline.valid[gap + 1]);
        assert_eq!(isoline.points[gap + 1], state.points[1].target);
    }

    #[test]
    fn start_and_finish_have_no_isoline() {
        let (_, state) = setup();
        assert_eq!(state.points[0].isoline.valid_count(), 0);
        assert_eq!(state.points[2].isoline.valid_count(), 0);
    }

    #[test]
    fn disabling_aat_invalidates_isolines() {
        let (waypoints, mut state) = setup();
        state.settings.aat_enabled = false;
        state.refresh(&Context {
            waypoints: &waypoints,
            target_editing: false,
        });
        assert_eq!(state.points[1].isoline.valid_count(), 0);
    }
}
