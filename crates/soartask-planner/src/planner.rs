/*
[INPUT]:  Parsed planner configuration
[OUTPUT]: Task store wired to its collaborators, task built from the configured route
[POS]:    Runner layer - turns configuration into a live task
[UPDATE]: When configuration gains new task-building options
*/

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use soartask_geo::{GeoPoint, WaypointDatabase, WaypointList};
use tracing::{debug, info};

use crate::config::{AatRegionConfig, PlannerConfig, RouteEntry};
use crate::flight::{EditSessionFlag, GlidePolarSettings};
use crate::task::{MutationOutcome, TaskState, TaskStore};

/// MacCready the runner starts with, in m/s.
const INITIAL_MAC_CREADY: f64 = 1.0;

pub struct Planner {
    pub store: Arc<TaskStore>,
    pub waypoints: Arc<WaypointList>,
    pub edit_session: Arc<EditSessionFlag>,
}

impl Planner {
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let waypoints = Arc::new(WaypointList::new(config.waypoints.clone()));
        let glide = Arc::new(GlidePolarSettings::new(
            INITIAL_MAC_CREADY,
            config.abort_safety.clone(),
        ));
        let edit_session = Arc::new(EditSessionFlag::default());
        let store = Arc::new(TaskStore::with_collaborators(
            waypoints.clone(),
            glide,
            edit_session.clone(),
            config.task.clone(),
        ));

        let planner = Self {
            store,
            waypoints,
            edit_session,
        };

        if let Some(home) = &config.home {
            let home = planner.resolve(home)?;
            planner.store.default_task(Some(home));
            debug!(home, "default task set");
        }
        Ok(planner)
    }

    pub fn resolve(&self, name: &str) -> Result<i32> {
        self.waypoints
            .position_by_name(name)
            .with_context(|| format!("unknown waypoint {name:?}"))
    }

    /// Replace the task with `route`, applying per-point AAT regions.
    pub fn plan_route(&self, route: &[RouteEntry]) -> Result<()> {
        let indices = route
            .iter()
            .map(|entry| self.resolve(&entry.name))
            .collect::<Result<Vec<_>>>()?;

        self.store.clear_task();
        for (index, entry) in indices.iter().zip(route) {
            match self.store.insert_waypoint(*index, true) {
                MutationOutcome::TaskFull => bail!("route is longer than the task capacity"),
                outcome => debug!(waypoint = %entry.name, ?outcome, "route point inserted"),
            }
        }

        for (slot, entry) in route.iter().enumerate() {
            let slot = slot as i32;
            match entry.aat {
                Some(AatRegionConfig::Circle { radius }) => {
                    self.store.set_aat_circle(slot, radius);
                }
                Some(AatRegionConfig::Sector {
                    radius,
                    start_radial,
                    finish_radial,
                }) => {
                    self.store
                        .set_aat_sector(slot, radius, start_radial, finish_radial);
                }
                None => {}
            }
        }

        info!(points = indices.len(), "route planned");
        Ok(())
    }
}

/// Printable view of a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub aat_enabled: bool,
    /// Metres
    pub total_distance: f64,
    pub active_index: i32,
    pub points: Vec<PointSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointSummary {
    pub slot: usize,
    pub name: String,
    pub leg_distance: f64,
    pub inbound_bearing: f64,
    pub target: GeoPoint,
    pub isoline_points: usize,
}

impl TaskSummary {
    pub fn from_state(state: &TaskState, waypoints: &dyn WaypointDatabase) -> Self {
        let points: Vec<PointSummary> = state
            .points
            .iter()
            .enumerate()
            .filter_map(|(slot, point)| {
                let waypoint = waypoints.get(point.waypoint_index)?;
                Some(PointSummary {
                    slot,
                    name: waypoint.name,
                    leg_distance: point.leg_distance,
                    inbound_bearing: point.inbound_bearing,
                    target: point.target,
                    isoline_points: point.isoline.valid_count(),
                })
            })
            .collect();

        Self {
            aat_enabled: state.settings.aat_enabled,
            total_distance: points.iter().map(|p| p.leg_distance).sum(),
            active_index: state.active_index,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::AatKind;

    fn config() -> PlannerConfig {
        serde_yaml::from_str(
            r#"
waypoints:
  - { name: Home, latitude: 47.0, longitude: 11.0, flags: 9 }
  - { name: Ridge, latitude: 47.4, longitude: 11.0 }
  - { name: Lake, latitude: 47.4, longitude: 11.6 }
home: Home
task:
  aat_enabled: true
route:
  - name: Home
  - name: ridge
    aat: { kind: circle, radius: 15000 }
  - name: Lake
"#,
        )
        .expect("parse")
    }

    #[test]
    fn home_becomes_default_task() {
        let planner = Planner::from_config(&config()).expect("planner");
        assert_eq!(planner.store.active_index(), 0);
        assert_eq!(planner.store.task_point(0).expect("home").waypoint_index, 0);
    }

    #[test]
    fn route_is_planned_in_order() {
        let config = config();
        let planner = Planner::from_config(&config).expect("planner");
        planner.plan_route(&config.route).expect("plan");

        let state = planner.store.snapshot();
        assert_eq!(&state.indices()[..4], &[0, 1, 2, -1]);
        assert_eq!(state.points[1].aat_kind, AatKind::Circle);
        assert_eq!(state.points[1].aat_circle_radius, 15_000.0);
    }

    #[test]
    fn summary_lists_occupied_points() {
        let config = config();
        let planner = Planner::from_config(&config).expect("planner");
        planner.plan_route(&config.route).expect("plan");

        let summary = TaskSummary::from_state(&planner.store.snapshot(), planner.waypoints.as_ref());
        assert_eq!(summary.points.len(), 3);
        assert_eq!(summary.points[1].name, "Ridge");
        assert!(summary.total_distance > 40_000.0);
        assert!(summary.points[1].isoline_points > 0);
    }

    #[test]
    fn unknown_route_name_fails() {
        let mut config = config();
        config.route[1].name = "Nowhere".into();
        let planner = Planner::from_config(&config).expect("planner");
        let err = planner.plan_route(&config.route).expect_err("unknown");
        assert!(err.to_string().contains("Nowhere"));
    }
}
