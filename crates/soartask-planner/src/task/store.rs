/*
[INPUT]:  Calls from the control and telemetry actors
[OUTPUT]: Serialised access to the task state with collaborators injected
[POS]:    Task layer - public facade over mutator, refresher, AAT and abort code
[UPDATE]: When exposing new task operations
*/

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use soartask_geo::{GeoPoint, WaypointDatabase};
use tracing::debug;

use super::{AatKind, Context, MutationOutcome, TaskPoint, TaskState, slot_index};
use crate::abort::{AbortRequest, TaskMode};
use crate::aat::region;
use crate::config::TaskSettings;
use crate::flight::{EditSessionFlag, GlidePolarSettings, GlideSettings, TargetEditSession};

/// Owner of the task. Every operation holds the lock for its whole duration.
pub struct TaskStore {
    state: Mutex<TaskState>,
    waypoints: Arc<dyn WaypointDatabase>,
    glide: Arc<dyn GlideSettings>,
    edit_session: Arc<dyn TargetEditSession>,
}

impl TaskStore {
    pub fn new(waypoints: Arc<dyn WaypointDatabase>, settings: TaskSettings) -> Self {
        Self::with_collaborators(
            waypoints,
            Arc::new(GlidePolarSettings::default()),
            Arc::new(EditSessionFlag::default()),
            settings,
        )
    }

    pub fn with_collaborators(
        waypoints: Arc<dyn WaypointDatabase>,
        glide: Arc<dyn GlideSettings>,
        edit_session: Arc<dyn TargetEditSession>,
        settings: TaskSettings,
    ) -> Self {
        Self {
            state: Mutex::new(TaskState::new(settings)),
            waypoints,
            glide,
            edit_session,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn context(&self) -> Context<'_> {
        Context {
            waypoints: self.waypoints.as_ref(),
            target_editing: self.edit_session.is_active(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TaskState, &Context<'_>) -> R) -> R {
        let ctx = self.context();
        let mut state = self.lock();
        f(&mut state, &ctx)
    }

    pub fn waypoints(&self) -> &Arc<dyn WaypointDatabase> {
        &self.waypoints
    }

    pub fn glide(&self) -> &Arc<dyn GlideSettings> {
        &self.glide
    }

    /// Consistent copy of the whole task.
    pub fn snapshot(&self) -> TaskState {
        self.lock().clone()
    }

    pub fn task_point(&self, slot: i32) -> Option<TaskPoint> {
        let state = self.lock();
        slot_index(slot)
            .map(|i| &state.points[i])
            .filter(|point| point.is_occupied())
            .cloned()
    }

    pub fn settings(&self) -> TaskSettings {
        self.lock().settings.clone()
    }

    pub fn update_settings(&self, settings: TaskSettings) {
        self.with_state(|state, ctx| {
            state.settings = settings;
            state.mark_modified();
            state.refresh(ctx);
        });
    }

    // Editing

    pub fn insert_waypoint(&self, waypoint: i32, append: bool) -> MutationOutcome {
        self.with_state(|state, ctx| state.insert_waypoint(ctx, waypoint, append))
    }

    pub fn remove_task_point(&self, slot: i32) -> MutationOutcome {
        self.with_state(|state, ctx| state.remove_task_point(ctx, slot))
    }

    pub fn remove_waypoint(&self, waypoint: i32) -> MutationOutcome {
        self.with_state(|state, ctx| state.remove_waypoint(ctx, waypoint))
    }

    pub fn remove_active_task_point(&self) -> MutationOutcome {
        self.with_state(|state, ctx| state.remove_active_task_point(ctx))
    }

    pub fn replace_waypoint(&self, waypoint: i32) -> MutationOutcome {
        self.with_state(|state, ctx| state.replace_waypoint(ctx, waypoint))
    }

    pub fn swap_waypoint(&self, slot: i32) -> MutationOutcome {
        self.with_state(|state, ctx| state.swap_waypoint(ctx, slot))
    }

    pub fn reset_task_point(&self, slot: i32) -> MutationOutcome {
        self.with_state(|state, ctx| state.reset_task_point(ctx, slot))
    }

    pub fn clear_task(&self) {
        self.with_state(|state, ctx| {
            state.clear();
            state.refresh(ctx);
        });
    }

    pub fn default_task(&self, home: Option<i32>) -> MutationOutcome {
        self.with_state(|state, ctx| state.default_task(ctx, home))
    }

    pub fn set_active_index(&self, slot: i32) -> MutationOutcome {
        self.with_state(|state, ctx| state.set_active_index(ctx, slot))
    }

    // Start points

    pub fn set_start_point(&self, slot: usize, waypoint: i32) -> MutationOutcome {
        self.with_state(|state, ctx| {
            let outcome = state.set_start_point(slot, waypoint);
            state.refresh(ctx);
            outcome
        })
    }

    pub fn clear_start_points(&self) {
        self.with_state(|state, ctx| {
            state.clear_start_points();
            state.refresh(ctx);
        });
    }

    pub fn rotate_start_points(&self) -> MutationOutcome {
        self.with_state(|state, ctx| state.rotate_start_points(ctx))
    }

    pub fn check_start_point_in_task(&self) {
        self.with_state(|state, ctx| {
            state.check_start_point_in_task();
            state.refresh(ctx);
        });
    }

    // AAT regions and targets

    fn edit_point(&self, slot: i32, edit: impl FnOnce(&mut TaskPoint)) -> MutationOutcome {
        self.with_state(|state, ctx| {
            let Some(i) = slot_index(slot).filter(|&i| state.points[i].is_occupied()) else {
                return MutationOutcome::Unchanged;
            };
            edit(&mut state.points[i]);
            state.mark_modified();
            state.refresh(ctx);
            MutationOutcome::Applied
        })
    }

    pub fn set_aat_circle(&self, slot: i32, radius: f64) -> MutationOutcome {
        self.edit_point(slot, |point| {
            point.aat_kind = AatKind::Circle;
            point.aat_circle_radius = radius;
        })
    }

    pub fn set_aat_sector(
        &self,
        slot: i32,
        radius: f64,
        start_radial: f64,
        finish_radial: f64,
    ) -> MutationOutcome {
        self.edit_point(slot, |point| {
            point.aat_kind = AatKind::Sector;
            point.aat_sector_radius = radius;
            point.aat_start_radial = start_radial;
            point.aat_finish_radial = finish_radial;
        })
    }

    /// Move a target by its normalised offsets; out-of-range values are
    /// clamped by the next target pass.
    pub fn set_target_offset(&self, slot: i32, radius: f64, radial: f64) -> MutationOutcome {
        self.edit_point(slot, |point| {
            point.target_offset_radius = radius;
            point.target_offset_radial = radial;
        })
    }

    pub fn set_target_locked(&self, slot: i32, locked: bool) -> MutationOutcome {
        self.edit_point(slot, |point| point.target_locked = locked)
    }

    pub fn refresh(&self) {
        self.with_state(|state, ctx| state.refresh(ctx));
    }

    /// Record a new fix and re-place the AAT targets around it.
    pub fn update_aircraft_position(&self, position: GeoPoint) {
        self.with_state(|state, ctx| {
            state.aircraft = Some(position);
            state.calculate_aat_targets(ctx);
        });
    }

    pub fn adjust_aat_targets(&self, desired: f64) -> f64 {
        self.with_state(|state, ctx| state.adjust_aat_targets(ctx, desired))
    }

    /// Region membership of `position` for the point in `slot`.
    pub fn in_aat_turn_sector(&self, position: GeoPoint, slot: i32) -> bool {
        self.with_state(|state, ctx| {
            region_of(state, ctx, slot)
                .is_some_and(|(point, center)| region::in_aat_region(point, center, position))
        })
    }

    pub fn find_inside_aat_sector_distance(
        &self,
        origin: GeoPoint,
        bearing: f64,
        slot: i32,
        start_distance: f64,
    ) -> f64 {
        self.with_state(|state, ctx| {
            region_of(state, ctx, slot)
                .map(|(point, center)| {
                    region::find_inside_distance(point, center, origin, bearing, start_distance)
                })
                .unwrap_or(start_distance)
        })
    }

    pub fn find_inside_aat_sector_range(
        &self,
        origin: GeoPoint,
        bearing: f64,
        slot: i32,
        start_distance: f64,
    ) -> f64 {
        self.with_state(|state, ctx| {
            region_of(state, ctx, slot)
                .map(|(point, center)| {
                    region::find_inside_range(point, center, origin, bearing, start_distance)
                })
                .unwrap_or(-1.0)
        })
    }

    // Abort and direct-to

    pub fn go_direct_to(&self, waypoint: i32) {
        self.with_state(|state, ctx| state.go_direct_to(ctx, self.glide.as_ref(), waypoint));
    }

    pub fn toggle_abort(&self, request: AbortRequest) -> TaskMode {
        self.with_state(|state, ctx| state.toggle_abort(ctx, self.glide.as_ref(), request))
    }

    pub fn mode(&self) -> TaskMode {
        self.lock().mode()
    }

    pub fn task_is_temporary(&self) -> bool {
        self.lock().task_is_temporary()
    }

    /// Closest landable to the last fix while the task is aborted.
    pub fn abort_destination(&self) -> Option<i32> {
        let state = self.lock();
        if !state.aborted {
            return None;
        }
        let destination = state
            .aircraft
            .and_then(|position| self.waypoints.nearest_landable(position));
        debug!(?destination, "abort destination");
        destination
    }

    // Queries

    pub fn active_index(&self) -> i32 {
        self.lock().active_index
    }

    pub fn valid_task_point(&self, slot: i32) -> bool {
        self.lock().valid_task_point(self.waypoints.as_ref(), slot)
    }

    /// The active slot holds a known waypoint.
    pub fn valid_task(&self) -> bool {
        let state = self.lock();
        state.valid_task_point(self.waypoints.as_ref(), state.active_index)
    }

    pub fn final_task_point(&self) -> i32 {
        self.lock().final_task_point()
    }

    pub fn active_is_final(&self) -> bool {
        self.lock().active_is_final()
    }

    pub fn is_final_waypoint(&self) -> bool {
        self.lock().is_final_waypoint(self.waypoints.as_ref())
    }

    pub fn waypoint_in_task(&self, waypoint: i32) -> bool {
        self.lock().waypoint_in_task(waypoint)
    }

    pub fn is_task_modified(&self) -> bool {
        self.lock().task_modified
    }

    pub fn is_target_modified(&self) -> bool {
        self.lock().target_modified
    }

    pub fn is_task_aborted(&self) -> bool {
        self.lock().aborted
    }

    pub fn task_file_name(&self) -> Option<PathBuf> {
        self.lock().file_name.clone()
    }
}

fn region_of<'s>(
    state: &'s TaskState,
    ctx: &Context<'_>,
    slot: i32,
) -> Option<(&'s TaskPoint, GeoPoint)> {
    let i = slot_index(slot)?;
    let point = &state.points[i];
    let center = ctx.waypoints.location(point.waypoint_index)?;
    Some((point, center))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soartask_geo::{Waypoint, WaypointList, destination};

    fn store() -> TaskStore {
        let waypoints = WaypointList::new(vec![
            Waypoint::new("Home", 47.0, 11.0),
            Waypoint::new("Ridge", 47.4, 11.0),
            Waypoint::new("Lake", 47.4, 11.6),
        ]);
        TaskStore::new(Arc::new(waypoints), TaskSettings::default())
    }

    fn plan(store: &TaskStore) {
        for index in [0, 1, 2] {
            assert!(store.insert_waypoint(index, true).is_applied());
        }
    }

    #[test]
    fn queries_reflect_planned_task() {
        let store = store();
        plan(&store);
        assert_eq!(store.active_index(), 0);
        assert!(store.valid_task());
        assert_eq!(store.final_task_point(), 2);
        assert!(!store.is_final_waypoint());
        assert!(store.waypoint_in_task(1));
        assert!(!store.waypoint_in_task(7));
        assert!(store.is_task_modified());
        assert!(store.task_point(3).is_none());
    }

    #[test]
    fn region_edits_require_occupied_slot() {
        let store = store();
        plan(&store);
        assert_eq!(store.set_aat_circle(5, 1_000.0), MutationOutcome::Unchanged);
        assert!(store.set_aat_circle(1, 8_000.0).is_applied());
        let point = store.task_point(1).expect("slot 1");
        assert_eq!(point.aat_kind, AatKind::Circle);
        assert_eq!(point.aat_circle_radius, 8_000.0);
    }

    #[test]
    fn region_queries_use_slot_geometry() {
        let store = store();
        plan(&store);
        store.set_aat_circle(1, 8_000.0);
        let ridge = GeoPoint::new(47.4, 11.0);

        assert!(store.in_aat_turn_sector(destination(ridge, 90.0, 5_000.0), 1));
        assert!(!store.in_aat_turn_sector(destination(ridge, 90.0, 9_000.0), 1));
        assert!(!store.in_aat_turn_sector(ridge, 8));

        let reach = store.find_inside_aat_sector_distance(ridge, 0.0, 1, 0.0);
        assert!(reach <= 8_000.0 && reach > 7_950.0);
        assert_eq!(store.find_inside_aat_sector_distance(ridge, 0.0, 9, 12.0), 12.0);
    }

    #[test]
    fn aircraft_fix_moves_active_target() {
        let store = store();
        plan(&store);
        let settings = TaskSettings {
            aat_enabled: true,
            ..store.settings()
        };
        store.update_settings(settings);
        store.set_aat_circle(1, 10_000.0);
        store.set_active_index(1);

        let before = store.task_point(1).expect("slot 1").target;
        let ridge = GeoPoint::new(47.4, 11.0);
        store.update_aircraft_position(destination(ridge, 180.0, 3_000.0));
        let after = store.task_point(1).expect("slot 1").target;
        assert_ne!(before, after);
        assert!(!store.is_target_modified());
    }

    #[test]
    fn abort_destination_is_nearest_landable() {
        let waypoints = WaypointList::new(vec![
            Waypoint::new("Home", 47.0, 11.0),
            Waypoint::new("Ridge", 47.4, 11.0),
            Waypoint::new("Field", 47.3, 11.1).with_flags(soartask_geo::WaypointFlags::AIRPORT),
        ]);
        let store = TaskStore::new(Arc::new(waypoints), TaskSettings::default());
        store.insert_waypoint(0, true);
        store.insert_waypoint(1, true);
        store.update_aircraft_position(GeoPoint::new(47.35, 11.0));
        assert_eq!(store.abort_destination(), None);

        assert_eq!(store.toggle_abort(AbortRequest::Abort), TaskMode::Aborted);
        assert_eq!(store.abort_destination(), Some(2));
    }
}
