/*
[INPUT]:  Waypoint indices, task settings, aircraft position
[OUTPUT]: Task point/start point models and the aggregate task state
[POS]:    Task layer - data model shared by mutator, refresher, AAT and abort code
[UPDATE]: When task point fields or capacities change
*/

pub mod mutator;
pub mod refresh;
pub mod store;

use std::path::PathBuf;

use soartask_geo::{GeoPoint, WaypointDatabase};

use crate::config::TaskSettings;

pub use mutator::MutationOutcome;
pub use store::TaskStore;

pub const MAX_TASK_POINTS: usize = 10;
pub const MAX_START_POINTS: usize = 10;
pub const MAX_ISOLINES: usize = 32;

/// Sentinel waypoint index of an empty slot.
pub const EMPTY_SLOT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneKind {
    #[default]
    Line,
    FaiSector,
    DaeSector,
    Cylinder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneRole {
    #[default]
    Start,
    Turn,
    Finish,
}

/// Observation zone derived from the neighbouring legs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObservationZone {
    pub kind: ZoneKind,
    pub role: ZoneRole,
    pub radius: f64,
    /// Half opening angle around `bearing`, in degrees
    pub half_angle: f64,
    /// Symmetry axis of the zone
    pub bearing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AatKind {
    #[default]
    Circle,
    Sector,
}

impl AatKind {
    pub fn code(self) -> u8 {
        match self {
            AatKind::Circle => 0,
            AatKind::Sector => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AatKind::Circle),
            1 => Some(AatKind::Sector),
            _ => None,
        }
    }
}

/// Traced constant-distance curve through an AAT region.
///
/// Slots that were not reached, or that mark the break between the two
/// traced arcs, are flagged invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct Isoline {
    pub points: [GeoPoint; MAX_ISOLINES],
    pub valid: [bool; MAX_ISOLINES],
}

impl Default for Isoline {
    fn default() -> Self {
        Self {
            points: [GeoPoint::default(); MAX_ISOLINES],
            valid: [false; MAX_ISOLINES],
        }
    }
}

impl Isoline {
    pub fn invalidate(&mut self) {
        self.valid = [false; MAX_ISOLINES];
    }

    pub fn set(&mut self, slot: usize, point: GeoPoint) {
        self.points[slot] = point;
        self.valid[slot] = true;
    }

    pub fn valid_points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.points
            .iter()
            .zip(self.valid.iter())
            .filter(|(_, valid)| **valid)
            .map(|(point, _)| *point)
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|valid| **valid).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskPoint {
    pub waypoint_index: i32,
    pub leg_distance: f64,
    pub inbound_bearing: f64,
    pub outbound_bearing: f64,
    pub bisector_bearing: f64,
    /// Share of the total task length flown on the leg into this point
    pub length_percent: f64,
    pub zone: ObservationZone,
    pub sector_start: GeoPoint,
    pub sector_end: GeoPoint,

    pub aat_kind: AatKind,
    pub aat_circle_radius: f64,
    pub aat_sector_radius: f64,
    pub aat_start_radial: f64,
    pub aat_finish_radial: f64,
    pub aat_start: GeoPoint,
    pub aat_finish: GeoPoint,

    pub target_offset_radius: f64,
    pub target_offset_radial: f64,
    pub target: GeoPoint,
    pub target_locked: bool,

    pub isoline: Isoline,
}

impl Default for TaskPoint {
    fn default() -> Self {
        Self {
            waypoint_index: EMPTY_SLOT,
            leg_distance: 0.0,
            inbound_bearing: 0.0,
            outbound_bearing: 0.0,
            bisector_bearing: 0.0,
            length_percent: 0.0,
            zone: ObservationZone::default(),
            sector_start: GeoPoint::default(),
            sector_end: GeoPoint::default(),
            aat_kind: AatKind::default(),
            aat_circle_radius: 0.0,
            aat_sector_radius: 0.0,
            aat_start_radial: 0.0,
            aat_finish_radial: 360.0,
            aat_start: GeoPoint::default(),
            aat_finish: GeoPoint::default(),
            target_offset_radius: 0.0,
            target_offset_radial: 0.0,
            target: GeoPoint::default(),
            target_locked: false,
            isoline: Isoline::default(),
        }
    }
}

impl TaskPoint {
    /// Empty slot carrying default AAT region radii.
    pub fn empty(default_radius: f64) -> Self {
        Self {
            aat_circle_radius: default_radius,
            aat_sector_radius: default_radius,
            ..Self::default()
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.waypoint_index >= 0
    }

    /// Radius of the AAT region that applies to `aat_kind`.
    pub fn aat_radius(&self) -> f64 {
        match self.aat_kind {
            AatKind::Circle => self.aat_circle_radius,
            AatKind::Sector => self.aat_sector_radius,
        }
    }

    /// Restore AAT defaults, keeping the waypoint assignment.
    pub fn reset_aat(&mut self, default_radius: f64) {
        self.target_offset_radius = 0.0;
        self.target_offset_radial = 0.0;
        self.target_locked = false;
        self.aat_sector_radius = default_radius;
        self.aat_circle_radius = default_radius;
        self.aat_start_radial = 0.0;
        self.aat_finish_radial = 360.0;
    }

    pub(crate) fn clear_offsets(&mut self) {
        self.target_offset_radius = 0.0;
        self.target_offset_radial = 0.0;
    }
}

/// Alternative start gate.
#[derive(Debug, Clone, PartialEq)]
pub struct StartPoint {
    pub waypoint_index: i32,
    pub active: bool,
    pub outbound_bearing: f64,
    pub sector_start: GeoPoint,
    pub sector_end: GeoPoint,
}

impl Default for StartPoint {
    fn default() -> Self {
        Self {
            waypoint_index: EMPTY_SLOT,
            active: false,
            outbound_bearing: 0.0,
            sector_start: GeoPoint::default(),
            sector_end: GeoPoint::default(),
        }
    }
}

impl StartPoint {
    pub fn is_occupied(&self) -> bool {
        self.waypoint_index >= 0
    }
}

/// Saved task structure while a temporary or aborted task is flown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskBackup {
    pub indices: [i32; MAX_TASK_POINTS],
    pub active_index: i32,
    pub aat_enabled: bool,
}

/// Everything guarded by the task store lock.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskState {
    pub points: [TaskPoint; MAX_TASK_POINTS],
    pub start_points: [StartPoint; MAX_START_POINTS],
    pub active_index: i32,
    pub aborted: bool,
    pub task_modified: bool,
    pub target_modified: bool,
    pub backup: Option<TaskBackup>,
    pub settings: TaskSettings,
    /// Last reported aircraft position, used by the AAT target pass
    pub aircraft: Option<GeoPoint>,
    pub file_name: Option<PathBuf>,
}

impl TaskState {
    pub fn new(settings: TaskSettings) -> Self {
        let radius = f64::from(settings.sector_radius);
        Self {
            points: std::array::from_fn(|_| TaskPoint::empty(radius)),
            start_points: std::array::from_fn(|_| StartPoint::default()),
            active_index: EMPTY_SLOT,
            aborted: false,
            task_modified: false,
            target_modified: false,
            backup: None,
            settings,
            aircraft: None,
            file_name: None,
        }
    }

    pub(crate) fn default_aat_radius(&self) -> f64 {
        f64::from(self.settings.sector_radius)
    }

    pub(crate) fn mark_modified(&mut self) {
        self.task_modified = true;
        self.target_modified = true;
    }

    /// Slot holding a waypoint that exists in the database.
    pub fn valid_task_point(&self, waypoints: &dyn WaypointDatabase, slot: i32) -> bool {
        slot_index(slot)
            .map(|i| waypoints.is_valid(self.points[i].waypoint_index))
            .unwrap_or(false)
    }

    /// Number of leading occupied slots.
    pub fn occupied_len(&self) -> usize {
        self.points
            .iter()
            .take_while(|point| point.is_occupied())
            .count()
    }

    pub fn indices(&self) -> [i32; MAX_TASK_POINTS] {
        std::array::from_fn(|i| self.points[i].waypoint_index)
    }

    pub fn active_slot(&self) -> Option<usize> {
        slot_index(self.active_index)
    }

    /// Index of the final occupied slot reachable from the active one.
    ///
    /// While aborted the active point is the final one.
    pub fn final_task_point(&self) -> i32 {
        let active = self.active_index.clamp(-1, MAX_TASK_POINTS as i32);
        if self.aborted {
            return active;
        }
        let mut i = (active + 1) as usize;
        while i < MAX_TASK_POINTS && self.points[i].is_occupied() {
            i += 1;
        }
        i as i32 - 1
    }

    pub fn active_is_final(&self) -> bool {
        self.active_index == self.final_task_point()
    }

    /// True when there is no occupied slot after the active one.
    pub fn is_final_waypoint(&self, waypoints: &dyn WaypointDatabase) -> bool {
        if !self.valid_task_point(waypoints, self.active_index) {
            return true;
        }
        !self.valid_task_point(waypoints, self.active_index + 1)
    }

    /// Waypoint is flown as part of the task or as an active start gate.
    pub fn waypoint_in_task(&self, waypoint: i32) -> bool {
        if waypoint < 0 {
            return false;
        }
        if self.points.iter().any(|p| p.waypoint_index == waypoint) {
            return true;
        }
        self.settings.multiple_start_points
            && self
                .start_points
                .iter()
                .any(|s| s.active && s.waypoint_index == waypoint)
    }
}

/// Collaborator answers needed while recomputing derived geometry.
pub(crate) struct Context<'a> {
    pub waypoints: &'a dyn WaypointDatabase,
    /// An operator is currently dragging targets around
    pub target_editing: bool,
}

pub(crate) fn slot_index(slot: i32) -> Option<usize> {
    if slot >= 0 && (slot as usize) < MAX_TASK_POINTS {
        Some(slot as usize)
    } else {
        None
    }
}
