/*
[INPUT]:  Waypoint indices and slot numbers from the control actor
[OUTPUT]: Structurally valid task slots, dirty flags, refreshed geometry
[POS]:    Task layer - insert/remove/replace/swap/reset and start point editing
[UPDATE]: When adding task editing operations or changing slot rules
*/

use tracing::debug;

use super::{
    Context, EMPTY_SLOT, MAX_START_POINTS, MAX_TASK_POINTS, StartPoint, TaskPoint, TaskState,
    slot_index,
};
use crate::error::TaskError;

/// Result of a task editing operation.
///
/// User confirmation (e.g. "remove the active point instead?") is left to
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// Nothing to do (empty or out of range slot)
    Unchanged,
    /// Every slot is occupied; the task was not touched
    TaskFull,
    /// The waypoint is not part of the task; the active point is the
    /// removal candidate
    NoMatchFound,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        self == MutationOutcome::Applied
    }

    pub fn into_result(self, waypoint: i32) -> Result<(), TaskError> {
        match self {
            MutationOutcome::Applied | MutationOutcome::Unchanged => Ok(()),
            MutationOutcome::TaskFull => Err(TaskError::TaskFull),
            MutationOutcome::NoMatchFound => Err(TaskError::WaypointNotInTask { waypoint }),
        }
    }
}

impl TaskState {
    fn reset_slot(&mut self, slot: usize, waypoint: i32) {
        let radius = self.default_aat_radius();
        let point = &mut self.points[slot];
        point.reset_aat(radius);
        point.waypoint_index = waypoint;
    }

    pub(crate) fn insert_waypoint(
        &mut self,
        ctx: &Context<'_>,
        waypoint: i32,
        append: bool,
    ) -> MutationOutcome {
        if self.active_index < 0 || !self.valid_task_point(ctx.waypoints, 0) {
            self.mark_modified();
            self.active_index = 0;
            self.reset_slot(0, waypoint);
            debug!(waypoint, "task started with first waypoint");
            self.refresh(ctx);
            return MutationOutcome::Applied;
        }

        if self.valid_task_point(ctx.waypoints, MAX_TASK_POINTS as i32 - 1) {
            debug!(waypoint, "insert rejected, task is full");
            return MutationOutcome::TaskFull;
        }

        self.mark_modified();
        let insert_at = self.active_index.max(0) as usize;
        if append {
            if let Some(free) = (insert_at + 1..MAX_TASK_POINTS)
                .find(|&slot| !self.points[slot].is_occupied())
            {
                self.reset_slot(free, waypoint);
                debug!(waypoint, slot = free, "waypoint appended");
            }
        } else {
            self.points[insert_at..].rotate_right(1);
            self.reset_slot(insert_at, waypoint);
            debug!(waypoint, slot = insert_at, "waypoint inserted");
        }

        self.refresh(ctx);
        MutationOutcome::Applied
    }

    /// Remove `slot` and close the gap; the caller owns `active_index`.
    fn remove_slot(&mut self, slot: usize) {
        self.points[slot..].rotate_left(1);
        let radius = self.default_aat_radius();
        let last = &mut self.points[MAX_TASK_POINTS - 1];
        *last = TaskPoint::empty(radius);
    }

    pub(crate) fn remove_task_point(&mut self, ctx: &Context<'_>, slot: i32) -> MutationOutcome {
        let Some(slot) = slot_index(slot) else {
            return MutationOutcome::Unchanged;
        };
        if !self.points[slot].is_occupied() {
            return MutationOutcome::Unchanged;
        }

        self.mark_modified();
        self.remove_slot(slot);
        debug!(slot, "task point removed");
        self.refresh(ctx);
        MutationOutcome::Applied
    }

    /// Remove a waypoint by identity.
    ///
    /// The first match at or after the active slot wins, then the nearest
    /// match before it.
    pub(crate) fn remove_waypoint(&mut self, ctx: &Context<'_>, waypoint: i32) -> MutationOutcome {
        let Some(active) = self.active_slot() else {
            return MutationOutcome::Unchanged;
        };

        self.mark_modified();

        let forward = (active..MAX_TASK_POINTS).find(|&i| self.points[i].waypoint_index == waypoint);
        let outcome = if let Some(slot) = forward {
            self.remove_slot(slot);
            if !self.points[active].is_occupied() {
                self.active_index -= 1;
            }
            debug!(waypoint, slot, "waypoint removed at or after active point");
            MutationOutcome::Applied
        } else if let Some(slot) = (0..active)
            .rev()
            .find(|&i| self.points[i].waypoint_index == waypoint)
        {
            self.remove_slot(slot);
            self.active_index -= 1;
            debug!(waypoint, slot, "waypoint removed before active point");
            MutationOutcome::Applied
        } else {
            debug!(waypoint, "waypoint not in task");
            MutationOutcome::NoMatchFound
        };

        self.refresh(ctx);
        outcome
    }

    pub(crate) fn remove_active_task_point(&mut self, ctx: &Context<'_>) -> MutationOutcome {
        let Some(active) = self.active_slot() else {
            return MutationOutcome::Unchanged;
        };
        if !self.points[active].is_occupied() {
            return MutationOutcome::Unchanged;
        }

        self.mark_modified();
        self.remove_slot(active);
        if !self.points[active].is_occupied() {
            self.active_index -= 1;
        }
        self.refresh(ctx);
        MutationOutcome::Applied
    }

    pub(crate) fn replace_waypoint(&mut self, ctx: &Context<'_>, waypoint: i32) -> MutationOutcome {
        self.mark_modified();
        if self.active_index < 0 {
            self.active_index = 0;
        }
        let slot = self.active_index as usize;
        self.reset_slot(slot, waypoint);
        self.refresh(ctx);
        MutationOutcome::Applied
    }

    pub(crate) fn swap_waypoint(&mut self, ctx: &Context<'_>, slot: i32) -> MutationOutcome {
        let Some(slot) = slot_index(slot) else {
            return MutationOutcome::Unchanged;
        };
        if slot + 1 >= MAX_TASK_POINTS {
            return MutationOutcome::Unchanged;
        }

        self.mark_modified();
        let outcome = if self.points[slot].is_occupied() && self.points[slot + 1].is_occupied() {
            self.points.swap(slot, slot + 1);
            MutationOutcome::Applied
        } else {
            MutationOutcome::Unchanged
        };
        self.refresh(ctx);
        outcome
    }

    pub(crate) fn reset_task_point(&mut self, ctx: &Context<'_>, slot: i32) -> MutationOutcome {
        let Some(slot) = slot_index(slot) else {
            return MutationOutcome::Unchanged;
        };

        self.mark_modified();
        let radius = self.default_aat_radius();
        self.points[slot].reset_aat(radius);
        self.refresh(ctx);
        MutationOutcome::Applied
    }

    /// Empty the task, start points and abort backup.
    pub(crate) fn clear(&mut self) {
        let radius = self.default_aat_radius();
        self.points = std::array::from_fn(|_| TaskPoint::empty(radius));
        self.start_points = std::array::from_fn(|_| StartPoint::default());
        self.backup = None;
        self.active_index = EMPTY_SLOT;
        self.file_name = None;
        self.mark_modified();
        debug!("task cleared");
    }

    /// Fly to `home` when no task is present.
    pub(crate) fn default_task(&mut self, ctx: &Context<'_>, home: Option<i32>) -> MutationOutcome {
        self.mark_modified();
        let mut outcome = MutationOutcome::Unchanged;
        if !self.points[0].is_occupied() || self.active_index < 0 {
            if let Some(home) = home.filter(|&home| home >= 0) {
                self.points[0].waypoint_index = home;
                self.active_index = 0;
                outcome = MutationOutcome::Applied;
            }
        }
        self.refresh(ctx);
        outcome
    }

    pub(crate) fn set_active_index(&mut self, ctx: &Context<'_>, slot: i32) -> MutationOutcome {
        if slot != EMPTY_SLOT && !self.valid_task_point(ctx.waypoints, slot) {
            return MutationOutcome::Unchanged;
        }
        self.active_index = slot;
        self.target_modified = true;
        self.refresh(ctx);
        MutationOutcome::Applied
    }

    pub(crate) fn set_start_point(&mut self, slot: usize, waypoint: i32) -> MutationOutcome {
        if slot >= MAX_START_POINTS {
            return MutationOutcome::Unchanged;
        }
        let start = &mut self.start_points[slot];
        start.waypoint_index = waypoint;
        start.active = true;
        self.task_modified = true;
        MutationOutcome::Applied
    }

    /// Only the task's own start remains as an (active) start point.
    pub(crate) fn clear_start_points(&mut self) {
        self.start_points = std::array::from_fn(|_| StartPoint::default());
        self.start_points[0].waypoint_index = self.points[0].waypoint_index;
        self.start_points[0].active = true;
        self.task_modified = true;
    }

    /// Cycle slot 0 through the active start points before the task starts.
    pub(crate) fn rotate_start_points(&mut self, ctx: &Context<'_>) -> MutationOutcome {
        if self.active_index > 0 || !self.settings.multiple_start_points {
            return MutationOutcome::Unchanged;
        }

        let mut found: Option<usize> = None;
        let mut last = 0;
        for (i, start) in self.start_points.iter().enumerate() {
            if start.active && ctx.waypoints.is_valid(start.waypoint_index) {
                if self.points[0].waypoint_index == start.waypoint_index {
                    found = Some(i);
                }
                last = i;
            }
        }

        let next = match found {
            Some(i) if i < last => i + 1,
            _ => 0,
        };
        let candidate = self.start_points[next].waypoint_index;
        if ctx.waypoints.is_valid(candidate) {
            self.points[0].waypoint_index = candidate;
            debug!(start = next, waypoint = candidate, "start point rotated");
        }

        self.mark_modified();
        self.refresh(ctx);
        MutationOutcome::Applied
    }

    /// Make sure the task's start waypoint is listed among the start points.
    pub(crate) fn check_start_point_in_task(&mut self) {
        let start_waypoint = self.points[0].waypoint_index;
        if start_waypoint == EMPTY_SLOT {
            return;
        }
        if self
            .start_points
            .iter()
            .any(|start| start.waypoint_index == start_waypoint)
        {
            return;
        }

        let slot = self
            .start_points
            .iter()
            .rposition(StartPoint::is_occupied)
            .map(|last| (last + 1).min(MAX_START_POINTS - 1))
            .unwrap_or(0);
        self.start_points[slot].waypoint_index = start_waypoint;
        self.start_points[slot].active = true;
        self.task_modified = true;
    }
}
