/*
[INPUT]:  Task state and waypoint database / task file bytes
[OUTPUT]: Binary task file (magic, task points, settings, start points, embedded waypoints)
[POS]:    Persistence layer - atomic save and all-or-nothing load of tasks
[UPDATE]: When the task file layout changes
*/

use std::io::Write;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use soartask_geo::{Waypoint, WaypointDatabase, WaypointFlags};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::{AutoAdvance, FinishKind, SectorKind, StartKind, TaskSettings};
use crate::error::{Result, TaskError};
use crate::task::{
    AatKind, Context, EMPTY_SLOT, MAX_START_POINTS, MAX_TASK_POINTS, TaskState, TaskStore,
};

pub const TASK_FILE_MAGIC: u32 = 0x5cf7_7fcc;

const NAME_LEN: usize = 50;
const CODE_LEN: usize = 12;
const WAYPOINT_RECORD_LEN: usize = 4 + 8 * 3 + 4 + NAME_LEN + CODE_LEN;

/// Persisted part of one task slot.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointRecord {
    index: i32,
    aat_kind: AatKind,
    circle_radius: f64,
    sector_radius: f64,
    start_radial: f64,
    finish_radial: f64,
    offset_radius: f64,
    offset_radial: f64,
    locked: bool,
}

/// Fully decoded task file, not yet applied to any state.
#[derive(Debug, Clone)]
struct TaskFile {
    points: [PointRecord; MAX_TASK_POINTS],
    settings: TaskSettings,
    start_points: [(i32, bool); MAX_START_POINTS],
    /// Embedded waypoints, task slots first; `None` past a truncated end
    waypoints: Vec<Option<Waypoint>>,
}

fn put_fixed_str(buf: &mut BytesMut, value: &str, len: usize) {
    let mut end = value.len().min(len - 1);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_slice(&value.as_bytes()[..end]);
    buf.put_bytes(0, len - end);
}

fn put_waypoint(buf: &mut BytesMut, waypoint: Option<&Waypoint>) {
    let Some(waypoint) = waypoint else {
        buf.put_bytes(0, WAYPOINT_RECORD_LEN);
        return;
    };
    buf.put_i32_le(waypoint.number);
    buf.put_f64_le(waypoint.latitude);
    buf.put_f64_le(waypoint.longitude);
    buf.put_f64_le(waypoint.altitude);
    buf.put_u32_le(waypoint.flags.0);
    put_fixed_str(buf, &waypoint.name, NAME_LEN);
    put_fixed_str(buf, &waypoint.code, CODE_LEN);
}

/// Serialise the task and the waypoints it references.
pub fn encode_task(state: &TaskState, waypoints: &dyn WaypointDatabase) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(2048);
    buf.put_u32_le(TASK_FILE_MAGIC);

    for point in &state.points {
        buf.put_i32_le(point.waypoint_index);
        buf.put_u8(point.aat_kind.code());
        buf.put_f64_le(point.aat_circle_radius);
        buf.put_f64_le(point.aat_sector_radius);
        buf.put_f64_le(point.aat_start_radial);
        buf.put_f64_le(point.aat_finish_radial);
        buf.put_f64_le(point.target_offset_radius);
        buf.put_f64_le(point.target_offset_radial);
        buf.put_u8(u8::from(point.target_locked));
    }

    let settings = &state.settings;
    buf.put_u8(u8::from(settings.aat_enabled));
    buf.put_f64_le(settings.aat_task_length);
    buf.put_u32_le(settings.finish_radius);
    buf.put_i32_le(settings.finish_kind.code());
    buf.put_u32_le(settings.start_radius);
    buf.put_i32_le(settings.start_kind.code());
    buf.put_i32_le(settings.sector_kind.code());
    buf.put_u32_le(settings.sector_radius);
    buf.put_i32_le(settings.auto_advance.code());
    buf.put_u8(u8::from(settings.multiple_start_points));

    for start in &state.start_points {
        buf.put_i32_le(start.waypoint_index);
        buf.put_u8(u8::from(start.active));
    }

    let task_indices = state.points.iter().map(|p| p.waypoint_index);
    let start_indices = state.start_points.iter().map(|s| s.waypoint_index);
    for index in task_indices.chain(start_indices) {
        put_waypoint(&mut buf, waypoints.get(index).as_ref());
    }

    buf.to_vec()
}

/// Bounds-checked little-endian reader.
struct Reader<'a> {
    buf: &'a [u8],
}

impl Reader<'_> {
    fn need(&self, len: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(TaskError::format(format!("truncated {what}")));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn bool(&mut self, what: &str) -> Result<bool> {
        Ok(self.u8(what)? != 0)
    }

    fn i32(&mut self, what: &str) -> Result<i32> {
        self.need(4, what)?;
        Ok(self.buf.get_i32_le())
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.need(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    fn f64(&mut self, what: &str) -> Result<f64> {
        self.need(8, what)?;
        Ok(self.buf.get_f64_le())
    }

    fn fixed_str(&mut self, len: usize) -> String {
        let (raw, rest) = self.buf.split_at(len);
        self.buf = rest;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    /// Next embedded waypoint, `None` once the data runs out.
    fn waypoint(&mut self) -> Option<Waypoint> {
        if self.buf.remaining() < WAYPOINT_RECORD_LEN {
            return None;
        }
        let number = self.buf.get_i32_le();
        let latitude = self.buf.get_f64_le();
        let longitude = self.buf.get_f64_le();
        let altitude = self.buf.get_f64_le();
        let flags = WaypointFlags(self.buf.get_u32_le());
        let name = self.fixed_str(NAME_LEN);
        let code = self.fixed_str(CODE_LEN);
        Some(Waypoint {
            number,
            name,
            code,
            latitude,
            longitude,
            altitude,
            flags,
        })
    }
}

fn enum_value<T>(code: i32, parse: fn(i32) -> Option<T>, what: &str) -> Result<T> {
    parse(code).ok_or_else(|| TaskError::format(format!("bad {what} value {code}")))
}

fn decode_task(data: &[u8]) -> Result<TaskFile> {
    let mut reader = Reader { buf: data };

    let magic = reader.u32("magic number")?;
    if magic != TASK_FILE_MAGIC {
        return Err(TaskError::format(format!("bad magic number {magic:#010x}")));
    }

    let mut points = Vec::with_capacity(MAX_TASK_POINTS);
    for _ in 0..MAX_TASK_POINTS {
        let index = reader.i32("task point")?;
        let kind = reader.u8("task point")?;
        let aat_kind = AatKind::from_code(kind)
            .ok_or_else(|| TaskError::format(format!("bad AAT region kind {kind}")))?;
        points.push(PointRecord {
            index,
            aat_kind,
            circle_radius: reader.f64("task point")?,
            sector_radius: reader.f64("task point")?,
            start_radial: reader.f64("task point")?,
            finish_radial: reader.f64("task point")?,
            offset_radius: reader.f64("task point")?,
            offset_radial: reader.f64("task point")?,
            locked: reader.bool("task point")?,
        });
    }
    let points: [PointRecord; MAX_TASK_POINTS] = points
        .try_into()
        .map_err(|_| TaskError::format("task point count"))?;

    let aat_enabled = reader.bool("settings")?;
    let aat_task_length = reader.f64("settings")?;
    let finish_radius = reader.u32("settings")?;
    let finish_kind = enum_value(reader.i32("settings")?, FinishKind::from_code, "finish kind")?;
    let start_radius = reader.u32("settings")?;
    let start_kind = enum_value(reader.i32("settings")?, StartKind::from_code, "start kind")?;
    let sector_kind = enum_value(reader.i32("settings")?, SectorKind::from_code, "sector kind")?;
    let sector_radius = reader.u32("settings")?;
    let auto_advance =
        enum_value(reader.i32("settings")?, AutoAdvance::from_code, "auto advance")?;
    let multiple_start_points = reader.bool("settings")?;

    let settings = TaskSettings {
        start_kind,
        start_radius,
        finish_kind,
        finish_radius,
        sector_kind,
        sector_radius,
        auto_advance,
        aat_enabled,
        aat_task_length,
        multiple_start_points,
    };

    let mut start_points = [(EMPTY_SLOT, false); MAX_START_POINTS];
    for start in &mut start_points {
        *start = (reader.i32("start point")?, reader.bool("start point")?);
    }

    let waypoints = (0..MAX_TASK_POINTS + MAX_START_POINTS)
        .map(|_| reader.waypoint())
        .collect();

    Ok(TaskFile {
        points,
        settings,
        start_points,
        waypoints,
    })
}

/// Whether a file index can be resolved without touching the database.
fn check_index(
    index: i32,
    embedded: Option<&Waypoint>,
    waypoints: &dyn WaypointDatabase,
) -> Result<()> {
    if index == EMPTY_SLOT || embedded.is_some() || waypoints.is_valid(index) {
        Ok(())
    } else {
        Err(TaskError::InvalidWaypoint { index })
    }
}

/// Map file indices onto the database, preferring embedded waypoints.
fn resolve_index(
    index: i32,
    embedded: Option<&Waypoint>,
    waypoints: &dyn WaypointDatabase,
) -> Result<i32> {
    if index == EMPTY_SLOT {
        return Ok(EMPTY_SLOT);
    }
    let resolved = match embedded {
        Some(waypoint) => waypoints.find_or_add(waypoint.clone()),
        None => index,
    };
    if waypoints.is_valid(resolved) {
        Ok(resolved)
    } else {
        Err(TaskError::InvalidWaypoint { index })
    }
}

impl TaskState {
    fn apply_task_file(&mut self, file: TaskFile, ctx: &Context<'_>) -> Result<()> {
        let embedded = |slot: usize| file.waypoints.get(slot).and_then(Option::as_ref);

        // reject the file before any embedded waypoint is appended
        for (i, record) in file.points.iter().enumerate() {
            check_index(record.index, embedded(i), ctx.waypoints)?;
        }
        for (i, (index, _)) in file.start_points.iter().enumerate() {
            check_index(*index, embedded(MAX_TASK_POINTS + i), ctx.waypoints)?;
        }

        let mut indices = [EMPTY_SLOT; MAX_TASK_POINTS];
        for (i, record) in file.points.iter().enumerate() {
            indices[i] = resolve_index(record.index, embedded(i), ctx.waypoints)?;
        }
        let mut start_indices = [EMPTY_SLOT; MAX_START_POINTS];
        for (i, (index, _)) in file.start_points.iter().enumerate() {
            start_indices[i] =
                resolve_index(*index, embedded(MAX_TASK_POINTS + i), ctx.waypoints)?;
        }

        self.settings = file.settings;
        self.clear();
        for ((point, record), index) in self.points.iter_mut().zip(&file.points).zip(indices) {
            point.waypoint_index = index;
            point.aat_kind = record.aat_kind;
            point.aat_circle_radius = record.circle_radius;
            point.aat_sector_radius = record.sector_radius;
            point.aat_start_radial = record.start_radial;
            point.aat_finish_radial = record.finish_radial;
            point.target_offset_radius = record.offset_radius;
            point.target_offset_radial = record.offset_radial;
            point.target_locked = record.locked;
        }
        for ((start, (_, active)), index) in self
            .start_points
            .iter_mut()
            .zip(file.start_points)
            .zip(start_indices)
        {
            start.waypoint_index = index;
            start.active = active;
        }

        self.refresh(ctx);
        Ok(())
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path)?;
    Ok(())
}

impl TaskStore {
    /// Write the task to `path`, replacing any previous file atomically.
    pub fn save_task(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut state = self.lock();
        let data = encode_task(&state, self.waypoints().as_ref());
        write_atomically(path, &data)?;

        state.task_modified = false;
        state.target_modified = false;
        state.file_name = Some(path.to_path_buf());
        info!(path = %path.display(), points = state.occupied_len(), "task saved");
        Ok(())
    }

    /// Save unless an aborted task is being flown. Returns whether a file
    /// was written.
    pub fn save_default_task(&self, path: impl AsRef<Path>) -> Result<bool> {
        if self.is_task_aborted() {
            info!("task aborted, default task not saved");
            return Ok(false);
        }
        self.save_task(path)?;
        Ok(true)
    }

    /// Replace the task with the contents of `path`.
    ///
    /// On any failure the task is cleared and the settings stay as they were.
    pub fn load_task(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ctx = self.context();
        let mut state = self.lock();

        let loaded = std::fs::read(path)
            .map_err(TaskError::from)
            .and_then(|data| decode_task(&data))
            .and_then(|file| state.apply_task_file(file, &ctx));

        match loaded {
            Ok(()) => {
                state.task_modified = false;
                state.target_modified = false;
                state.file_name = Some(path.to_path_buf());
                info!(path = %path.display(), points = state.occupied_len(), "task loaded");
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "task file rejected");
                state.clear();
                state.refresh(&ctx);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soartask_geo::WaypointList;

    fn waypoints() -> WaypointList {
        WaypointList::new(vec![
            Waypoint::new("Home", 47.0, 11.0),
            Waypoint::new("Ridge", 47.4, 11.0),
        ])
    }

    fn state(waypoints: &WaypointList) -> TaskState {
        let mut state = TaskState::new(TaskSettings::default());
        state.points[0].waypoint_index = 0;
        state.points[1].waypoint_index = 1;
        state.refresh(&Context {
            waypoints,
            target_editing: false,
        });
        state
    }

    #[test]
    fn encoded_layout_has_fixed_size() {
        let waypoints = waypoints();
        let data = encode_task(&state(&waypoints), &waypoints);
        let point_len = 4 + 1 + 6 * 8 + 1;
        let settings_len = 1 + 8 + 7 * 4 + 1;
        let start_len = 5;
        let expected = 4
            + MAX_TASK_POINTS * point_len
            + settings_len
            + MAX_START_POINTS * start_len
            + (MAX_TASK_POINTS + MAX_START_POINTS) * WAYPOINT_RECORD_LEN;
        assert_eq!(data.len(), expected);
        assert_eq!(&data[..4], &TASK_FILE_MAGIC.to_le_bytes());
    }

    #[test]
    fn decode_reads_back_settings_and_names() {
        let waypoints = waypoints();
        let data = encode_task(&state(&waypoints), &waypoints);
        let file = decode_task(&data).expect("decode");
        assert_eq!(file.settings, TaskSettings::default());
        assert_eq!(file.points[1].index, 1);
        assert_eq!(file.points[2].index, EMPTY_SLOT);
        let ridge = file.waypoints[1].as_ref().expect("embedded");
        assert_eq!(ridge.name, "Ridge");
        assert!(ridge.matches(&Waypoint::new("Ridge", 47.4, 11.0)));
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let mut buf = BytesMut::new();
        let name = "é".repeat(30);
        put_fixed_str(&mut buf, &name, NAME_LEN);
        assert_eq!(buf.len(), NAME_LEN);
        let mut reader = Reader { buf: &buf };
        let decoded = reader.fixed_str(NAME_LEN);
        assert_eq!(decoded, "é".repeat(24));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = decode_task(&[0, 1, 2, 3, 4]).expect_err("bad magic");
        assert!(err.is_file_error());
    }

    #[test]
    fn truncated_settings_are_rejected() {
        let waypoints = waypoints();
        let data = encode_task(&state(&waypoints), &waypoints);
        let err = decode_task(&data[..4 + MAX_TASK_POINTS * 54 + 3]).expect_err("truncated");
        assert!(err.to_string().contains("truncated settings"));
    }

    #[test]
    fn truncated_waypoints_are_optional() {
        let waypoints = waypoints();
        let data = encode_task(&state(&waypoints), &waypoints);
        let cut = data.len() - WAYPOINT_RECORD_LEN * 15;
        let file = decode_task(&data[..cut]).expect("decode");
        assert!(file.waypoints[4].is_some());
        assert!(file.waypoints[5].is_none());
    }

    #[test]
    fn bad_enum_value_is_rejected() {
        let waypoints = waypoints();
        let mut data = encode_task(&state(&waypoints), &waypoints);
        // finish kind follows the AAT flag, task length and finish radius
        let offset = 4 + MAX_TASK_POINTS * 54 + 1 + 8 + 4;
        data[offset..offset + 4].copy_from_slice(&9_i32.to_le_bytes());
        let err = decode_task(&data).expect_err("bad finish kind");
        assert!(err.to_string().contains("finish kind"));
    }

    #[test]
    fn unresolvable_index_is_an_error() {
        let waypoints = waypoints();
        assert!(matches!(
            resolve_index(7, None, &waypoints),
            Err(TaskError::InvalidWaypoint { index: 7 })
        ));
        let added = resolve_index(7, Some(&Waypoint::new("Far", 46.0, 10.0)), &waypoints)
            .expect("embedded");
        assert_eq!(added, 2);
    }

    #[test]
    fn index_check_leaves_database_alone() {
        let waypoints = waypoints();
        assert!(matches!(
            check_index(7, None, &waypoints),
            Err(TaskError::InvalidWaypoint { index: 7 })
        ));
        assert!(check_index(EMPTY_SLOT, None, &waypoints).is_ok());
        assert!(check_index(7, Some(&Waypoint::new("Far", 46.0, 10.0)), &waypoints).is_ok());
        assert_eq!(waypoints.len(), 2);
    }
}
