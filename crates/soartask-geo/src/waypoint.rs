/*
[INPUT]:  Waypoint records from configuration files or embedded task files
[OUTPUT]: Indexed waypoint lookup, identity matching and append-on-miss
[POS]:    Data layer - the waypoint database consumed by the task planner
[UPDATE]: When waypoint attributes or matching rules change
*/

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::earth::{GeoPoint, distance};

/// Tolerance in degrees when matching an embedded waypoint to the database.
const MATCH_TOLERANCE_DEG: f64 = 1e-5;

/// Waypoint attribute bits (airport, turnpoint, landable, home, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointFlags(pub u32);

impl WaypointFlags {
    pub const AIRPORT: Self = Self(0x01);
    pub const TURNPOINT: Self = Self(0x02);
    pub const LANDPOINT: Self = Self(0x04);
    pub const HOME: Self = Self(0x08);
    pub const START: Self = Self(0x10);
    pub const FINISH: Self = Self(0x20);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_landable(self) -> bool {
        self.contains(Self::AIRPORT) || self.contains(Self::LANDPOINT)
    }
}

impl std::ops::BitOr for WaypointFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(default)]
    pub number: i32,
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub flags: WaypointFlags,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            flags: WaypointFlags::TURNPOINT,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: WaypointFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Same name and same place, within a small tolerance.
    pub fn matches(&self, other: &Waypoint) -> bool {
        self.name == other.name
            && (self.latitude - other.latitude).abs() < MATCH_TOLERANCE_DEG
            && (self.longitude - other.longitude).abs() < MATCH_TOLERANCE_DEG
    }
}

/// Waypoint lookup used by the task planner.
///
/// Indices are `i32` so the `-1` empty-slot sentinel of task slots can be
/// passed straight through; negative or out-of-range indices are invalid.
pub trait WaypointDatabase: Send + Sync {
    fn len(&self) -> usize;

    fn get(&self, index: i32) -> Option<Waypoint>;

    fn find_matching(&self, waypoint: &Waypoint) -> Option<i32>;

    /// Resolve `waypoint` to an existing entry, appending it when absent.
    fn find_or_add(&self, waypoint: Waypoint) -> i32;

    fn nearest_landable(&self, position: GeoPoint) -> Option<i32>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, index: i32) -> bool {
        index >= 0 && (index as usize) < self.len()
    }

    fn location(&self, index: i32) -> Option<GeoPoint> {
        self.get(index).map(|wp| wp.location())
    }
}

/// In-memory waypoint database.
#[derive(Debug, Default)]
pub struct WaypointList {
    waypoints: RwLock<Vec<Waypoint>>,
}

impl WaypointList {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints: RwLock::new(waypoints),
        }
    }

    pub fn position_by_name(&self, name: &str) -> Option<i32> {
        let guard = self.waypoints.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .iter()
            .position(|wp| wp.name.eq_ignore_ascii_case(name))
            .map(|i| i as i32)
    }

    pub fn to_vec(&self) -> Vec<Waypoint> {
        self.waypoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WaypointDatabase for WaypointList {
    fn len(&self) -> usize {
        self.waypoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn get(&self, index: i32) -> Option<Waypoint> {
        if index < 0 {
            return None;
        }
        let guard = self.waypoints.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(index as usize).cloned()
    }

    fn find_matching(&self, waypoint: &Waypoint) -> Option<i32> {
        let guard = self.waypoints.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .iter()
            .position(|wp| wp.matches(waypoint))
            .map(|i| i as i32)
    }

    fn find_or_add(&self, waypoint: Waypoint) -> i32 {
        let mut guard = self.waypoints.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = guard.iter().position(|wp| wp.matches(&waypoint)) {
            return found as i32;
        }
        debug!(name = %waypoint.name, "appending waypoint missing from database");
        guard.push(waypoint);
        (guard.len() - 1) as i32
    }

    fn nearest_landable(&self, position: GeoPoint) -> Option<i32> {
        let guard = self.waypoints.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .iter()
            .enumerate()
            .filter(|(_, wp)| wp.flags.is_landable())
            .map(|(i, wp)| (i, distance(position, wp.location())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i as i32)
    }
}
