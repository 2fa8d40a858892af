/*
[INPUT]:  Abort/resume requests, direct-to waypoint, glide settings
[OUTPUT]: Backed-up and restored task structure, task mode
[POS]:    Abort layer - temporary replacement of the planned task
[UPDATE]: When abort or direct-to transitions change
*/

use tracing::info;

use crate::flight::GlideSettings;
use crate::task::{Context, EMPTY_SLOT, TaskBackup, TaskState};

/// What the pilot is currently flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    Normal,
    /// Single-point direct-to with the planned task held in backup
    TemporaryDirect,
    Aborted,
}

/// Requested abort transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortRequest {
    Abort,
    Resume,
    Toggle,
}

impl AbortRequest {
    /// Positive aborts, negative resumes, zero toggles.
    pub fn from_signed(set: i32) -> Self {
        match set.signum() {
            1 => AbortRequest::Abort,
            -1 => AbortRequest::Resume,
            _ => AbortRequest::Toggle,
        }
    }
}

impl TaskState {
    pub fn task_is_temporary(&self) -> bool {
        if self.aborted {
            return true;
        }
        let single_point = self.points[0].is_occupied() && !self.points[1].is_occupied();
        single_point
            && self
                .backup
                .is_some_and(|backup| backup.indices[0] != EMPTY_SLOT)
    }

    pub fn mode(&self) -> TaskMode {
        if self.aborted {
            TaskMode::Aborted
        } else if self.task_is_temporary() {
            TaskMode::TemporaryDirect
        } else {
            TaskMode::Normal
        }
    }

    pub(crate) fn backup_task(&mut self) {
        self.backup = Some(TaskBackup {
            indices: self.indices(),
            active_index: self.active_index,
            aat_enabled: self.settings.aat_enabled,
        });
    }

    fn restore_backup(&mut self, ctx: &Context<'_>) {
        if let Some(backup) = self.backup.take() {
            for (point, index) in self.points.iter_mut().zip(backup.indices) {
                point.waypoint_index = index;
            }
            self.active_index = backup.active_index;
            self.settings.aat_enabled = backup.aat_enabled;
        }
        self.refresh(ctx);
    }

    pub(crate) fn toggle_abort(
        &mut self,
        ctx: &Context<'_>,
        glide: &dyn GlideSettings,
        request: AbortRequest,
    ) -> TaskMode {
        let temporary_on_entry = self.task_is_temporary();
        let was_aborted = self.aborted;

        match request {
            AbortRequest::Abort => self.aborted = true,
            AbortRequest::Resume => self.aborted = false,
            // resuming a direct-to needs no flag change
            AbortRequest::Toggle if temporary_on_entry && !self.aborted => {}
            AbortRequest::Toggle => self.aborted = !self.aborted,
        }

        if temporary_on_entry != self.aborted {
            if self.aborted {
                self.backup_task();
                self.enter_abort(glide);
            } else {
                self.restore_backup(ctx);
                info!(active = self.active_index, "task resumed");
            }
        } else if self.aborted && !was_aborted {
            // a pending direct-to already holds the planned task in backup
            self.enter_abort(glide);
        }

        self.mode()
    }

    fn enter_abort(&mut self, glide: &dyn GlideSettings) {
        self.active_index = EMPTY_SLOT;
        self.settings.aat_enabled = false;

        if !glide.abort_safety_use_current() {
            let mac_cready = glide.mac_cready().min(glide.abort_safety_mac_cready());
            glide.set_mac_cready(mac_cready);
        }
        info!(mac_cready = glide.mac_cready(), "task aborted");
    }

    pub(crate) fn go_direct_to(
        &mut self,
        ctx: &Context<'_>,
        glide: &dyn GlideSettings,
        waypoint: i32,
    ) {
        if !ctx.waypoints.is_valid(waypoint) {
            return;
        }
        if self.aborted {
            self.toggle_abort(ctx, glide, AbortRequest::Resume);
        }
        if !self.task_is_temporary() {
            self.backup_task();
        }

        // only the indices change, so AAT regions survive until resume
        for point in &mut self.points[1..] {
            point.waypoint_index = EMPTY_SLOT;
        }
        self.points[0].waypoint_index = waypoint;
        self.settings.aat_enabled = false;
        self.active_index = 0;
        self.mark_modified();
        info!(waypoint, "flying direct");
        self.refresh(ctx);
    }
}
