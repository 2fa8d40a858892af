/*
[INPUT]:  Occupied task slots, waypoint coordinates, task settings
[OUTPUT]: Leg distances, bearings, bisectors and observation zone edges
[POS]:    Task layer - derived geometry recomputed after every structural change
[UPDATE]: When zone shapes or leg bookkeeping change
*/

use soartask_geo::{
    GeoPoint, WaypointDatabase, angle_limit_360, bisector, destination, distance_bearing,
};
use tracing::debug;

use super::{
    Context, EMPTY_SLOT, MAX_TASK_POINTS, ObservationZone, TaskState, ZoneKind, ZoneRole,
};
use crate::config::{FinishKind, SectorKind, StartKind, TaskSettings};

/// Edge length of the German DAe 0.5/10 sector.
const DAE_SECTOR_RADIUS: f64 = 10_000.0;

fn start_zone(settings: &TaskSettings, bearing: f64) -> ObservationZone {
    let (kind, half_angle) = match settings.start_kind {
        StartKind::Cylinder => (ZoneKind::Cylinder, 90.0),
        StartKind::Line => (ZoneKind::Line, 90.0),
        StartKind::Sector => (ZoneKind::FaiSector, 135.0),
    };
    ObservationZone {
        kind,
        role: ZoneRole::Start,
        radius: f64::from(settings.start_radius),
        half_angle,
        bearing,
    }
}

fn turn_zone(settings: &TaskSettings, bearing: f64) -> ObservationZone {
    let (kind, radius) = match settings.sector_kind {
        SectorKind::Cylinder => (ZoneKind::Cylinder, f64::from(settings.sector_radius)),
        SectorKind::FaiSector => (ZoneKind::FaiSector, f64::from(settings.sector_radius)),
        SectorKind::DaeSector => (ZoneKind::DaeSector, DAE_SECTOR_RADIUS),
    };
    ObservationZone {
        kind,
        role: ZoneRole::Turn,
        radius,
        half_angle: 45.0,
        bearing,
    }
}

fn finish_zone(settings: &TaskSettings, bearing: f64) -> ObservationZone {
    let (kind, half_angle) = match settings.finish_kind {
        FinishKind::Cylinder => (ZoneKind::Cylinder, 90.0),
        FinishKind::Line => (ZoneKind::Line, 90.0),
        FinishKind::Sector => (ZoneKind::FaiSector, 45.0),
    };
    ObservationZone {
        kind,
        role: ZoneRole::Finish,
        radius: f64::from(settings.finish_radius),
        half_angle,
        bearing,
    }
}

/// Edge ray end points of a zone centred on `center`.
fn zone_edges(center: GeoPoint, zone: &ObservationZone) -> (GeoPoint, GeoPoint) {
    (
        destination(center, zone.bearing + zone.half_angle, zone.radius),
        destination(center, zone.bearing - zone.half_angle, zone.radius),
    )
}

impl TaskState {
    /// Recompute every derived field, then the AAT targets and isolines.
    pub(crate) fn refresh(&mut self, ctx: &Context<'_>) {
        if self.active_index < 0 && self.points[0].is_occupied() {
            self.active_index = 0;
        }

        self.compact_slots(ctx.waypoints);
        self.refresh_legs(ctx.waypoints);
        self.calculate_task_sectors(ctx.waypoints);

        if self.settings.aat_enabled {
            self.calculate_aat_targets(ctx);
        } else {
            self.collapse_targets(ctx.waypoints);
        }
    }

    /// Drop slots whose waypoint no longer exists, keeping order.
    fn compact_slots(&mut self, waypoints: &dyn WaypointDatabase) {
        let mut write = 0;
        for read in 0..MAX_TASK_POINTS {
            if waypoints.is_valid(self.points[read].waypoint_index) {
                if read != write {
                    self.points.swap(read, write);
                }
                write += 1;
            }
        }

        for point in &mut self.points[write..] {
            if point.waypoint_index != EMPTY_SLOT {
                debug!(waypoint = point.waypoint_index, "dropping slot with unknown waypoint");
                point.waypoint_index = EMPTY_SLOT;
            }
        }

        if self.active_index >= write as i32 {
            self.active_index = write as i32 - 1;
        }
    }

    pub(crate) fn locations(
        &self,
        waypoints: &dyn WaypointDatabase,
    ) -> [Option<GeoPoint>; MAX_TASK_POINTS] {
        std::array::from_fn(|i| waypoints.location(self.points[i].waypoint_index))
    }

    fn refresh_legs(&mut self, waypoints: &dyn WaypointDatabase) {
        let locations = self.locations(waypoints);
        let occupied = self.occupied_len();
        let mut total = 0.0;

        for i in 0..occupied {
            if i == 0 {
                self.points[0].leg_distance = 0.0;
                self.points[0].inbound_bearing = 0.0;
                continue;
            }
            let (Some(previous), Some(current)) = (locations[i - 1], locations[i]) else {
                continue;
            };

            let (leg, inbound) = distance_bearing(previous, current);
            self.points[i].leg_distance = leg;
            self.points[i].inbound_bearing = inbound;
            total += leg;

            let prev = &mut self.points[i - 1];
            prev.outbound_bearing = inbound;
            prev.bisector_bearing = bisector(prev.inbound_bearing, inbound);

            if i == 1 && self.settings.multiple_start_points {
                for start in self.start_points.iter_mut().filter(|s| s.active) {
                    if let Some(origin) = waypoints.location(start.waypoint_index) {
                        start.outbound_bearing = distance_bearing(origin, current).1;
                    }
                }
            }
        }

        if occupied > 0 {
            let finish = &mut self.points[occupied - 1];
            finish.outbound_bearing = finish.inbound_bearing;
            finish.bisector_bearing = bisector(finish.inbound_bearing, finish.inbound_bearing);
        }

        if total > 0.0 {
            for point in &mut self.points[..occupied] {
                point.length_percent = point.leg_distance / total;
            }
            if let Some(location) = locations[occupied - 1] {
                let finish = &mut self.points[occupied - 1];
                finish.clear_offsets();
                finish.target = location;
            }
        }
    }

    fn calculate_task_sectors(&mut self, waypoints: &dyn WaypointDatabase) {
        if self.settings.multiple_start_points {
            for start in self.start_points.iter_mut().filter(|s| s.active) {
                let Some(origin) = waypoints.location(start.waypoint_index) else {
                    continue;
                };
                let zone = start_zone(&self.settings, start.outbound_bearing);
                (start.sector_start, start.sector_end) = zone_edges(origin, &zone);
            }
        }

        let locations = self.locations(waypoints);
        let occupied = self.occupied_len();
        for i in 0..occupied {
            let Some(center) = locations[i] else {
                continue;
            };
            let point = &self.points[i];
            let zone = if i + 1 < occupied {
                if i == 0 {
                    start_zone(&self.settings, point.outbound_bearing)
                } else {
                    turn_zone(&self.settings, point.bisector_bearing)
                }
            } else {
                finish_zone(&self.settings, point.inbound_bearing)
            };

            let (sector_start, sector_end) = zone_edges(center, &zone);
            let point = &mut self.points[i];
            point.zone = zone;
            point.sector_start = sector_start;
            point.sector_end = sector_end;

            if !self.settings.aat_enabled {
                point.aat_start_radial = angle_limit_360(zone.bearing - zone.half_angle);
                point.aat_finish_radial = angle_limit_360(zone.bearing + zone.half_angle);
            }
        }
    }

    /// Without AAT every target sits on its waypoint.
    fn collapse_targets(&mut self, waypoints: &dyn WaypointDatabase) {
        let locations = self.locations(waypoints);
        let occupied = self.occupied_len();
        for (point, location) in self.points[..occupied].iter_mut().zip(locations) {
            if let Some(location) = location {
                point.target = location;
            }
            point.isoline.invalidate();
        }
    }
}
