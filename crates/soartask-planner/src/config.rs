/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed planner configuration and task-level settings
[POS]:    Configuration layer - task rules, waypoints and runner setup
[UPDATE]: When adding new configuration options
*/

use serde::{Deserialize, Serialize};
use soartask_geo::Waypoint;

use crate::task::MAX_TASK_POINTS;

/// Top-level configuration for the task planner runner
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Waypoint database loaded at startup
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    /// Name of the home waypoint, used for the default task
    #[serde(default)]
    pub home: Option<String>,
    /// Task rules applied to every task point
    #[serde(default)]
    pub task: TaskSettings,
    /// Task waypoints in flying order, by name
    #[serde(default)]
    pub route: Vec<RouteEntry>,
    /// MacCready handling while a task is aborted
    #[serde(default)]
    pub abort_safety: AbortSafetyConfig,
}

/// A route entry with optional per-turnpoint AAT region overrides
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteEntry {
    pub name: String,
    #[serde(default)]
    pub aat: Option<AatRegionConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AatRegionConfig {
    Circle {
        radius: f64,
    },
    Sector {
        radius: f64,
        start_radial: f64,
        finish_radial: f64,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AbortSafetyConfig {
    /// Keep the current MacCready setting when aborting
    #[serde(default)]
    pub use_current: bool,
    /// MacCready ceiling (m/s) applied on abort
    #[serde(default = "default_abort_mac_cready")]
    pub mac_cready: f64,
}

impl Default for AbortSafetyConfig {
    fn default() -> Self {
        Self {
            use_current: false,
            mac_cready: default_abort_mac_cready(),
        }
    }
}

/// Start observation zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartKind {
    Cylinder,
    Line,
    Sector,
}

/// Finish observation zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishKind {
    Cylinder,
    Line,
    Sector,
}

/// Turnpoint observation zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorKind {
    Cylinder,
    FaiSector,
    /// German DAe 0.5/10 sector, fixed 10 km edge
    DaeSector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAdvance {
    Manual,
    Auto,
    Arm,
    ArmStart,
}

macro_rules! file_codes {
    ($ty:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $ty {
            /// Integer code used in the binary task file
            pub fn code(self) -> i32 {
                match self {
                    $($ty::$variant => $code,)+
                }
            }

            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

file_codes!(StartKind { Cylinder = 0, Line = 1, Sector = 2 });
file_codes!(FinishKind { Cylinder = 0, Line = 1, Sector = 2 });
file_codes!(SectorKind { Cylinder = 0, FaiSector = 1, DaeSector = 2 });
file_codes!(AutoAdvance { Manual = 0, Auto = 1, Arm = 2, ArmStart = 3 });

/// Task rules shared by every task point.
///
/// Lives inside the locked task state so a failed file load can leave it
/// untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskSettings {
    #[serde(default = "default_start_kind")]
    pub start_kind: StartKind,
    /// Start line/cylinder radius in metres
    #[serde(default = "default_line_radius")]
    pub start_radius: u32,
    #[serde(default = "default_finish_kind")]
    pub finish_kind: FinishKind,
    /// Finish line/cylinder radius in metres
    #[serde(default = "default_line_radius")]
    pub finish_radius: u32,
    #[serde(default = "default_sector_kind")]
    pub sector_kind: SectorKind,
    /// Turnpoint sector radius in metres, also the AAT region default
    #[serde(default = "default_sector_radius")]
    pub sector_radius: u32,
    #[serde(default = "default_auto_advance")]
    pub auto_advance: AutoAdvance,
    #[serde(default)]
    pub aat_enabled: bool,
    /// Minimum AAT task time in minutes
    #[serde(default = "default_aat_task_length")]
    pub aat_task_length: f64,
    #[serde(default)]
    pub multiple_start_points: bool,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            start_kind: default_start_kind(),
            start_radius: default_line_radius(),
            finish_kind: default_finish_kind(),
            finish_radius: default_line_radius(),
            sector_kind: default_sector_kind(),
            sector_radius: default_sector_radius(),
            auto_advance: default_auto_advance(),
            aat_enabled: false,
            aat_task_length: default_aat_task_length(),
            multiple_start_points: false,
        }
    }
}

fn default_start_kind() -> StartKind {
    StartKind::Line
}

fn default_finish_kind() -> FinishKind {
    FinishKind::Line
}

fn default_sector_kind() -> SectorKind {
    SectorKind::FaiSector
}

fn default_auto_advance() -> AutoAdvance {
    AutoAdvance::Auto
}

fn default_line_radius() -> u32 {
    1000
}

fn default_sector_radius() -> u32 {
    500
}

fn default_aat_task_length() -> f64 {
    180.0
}

fn default_abort_mac_cready() -> f64 {
    0.0
}

impl PlannerConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject routes that cannot become a task.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.route.len() > MAX_TASK_POINTS {
            anyhow::bail!(
                "route has {} points, at most {MAX_TASK_POINTS} are allowed",
                self.route.len()
            );
        }
        for entry in &self.route {
            let radius = match entry.aat {
                Some(AatRegionConfig::Circle { radius }) => radius,
                Some(AatRegionConfig::Sector { radius, .. }) => radius,
                None => continue,
            };
            if radius.is_nan() || radius <= 0.0 {
                anyhow::bail!("AAT radius for {} must be positive", entry.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_task_section_uses_defaults() {
        let config: PlannerConfig = serde_yaml::from_str("waypoints: []\n").expect("parse");
        assert_eq!(config.task, TaskSettings::default());
        assert!(config.route.is_empty());
        assert!(!config.abort_safety.use_current);
    }

    #[test]
    fn parses_route_with_aat_regions() {
        let yaml = r#"
task:
  aat_enabled: true
  sector_kind: dae_sector
route:
  - name: Home
  - name: Ridge
    aat:
      kind: sector
      radius: 20000
      start_radial: 300
      finish_radial: 60
  - name: Lake
    aat:
      kind: circle
      radius: 10000
"#;
        let config: PlannerConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(config.task.aat_enabled);
        assert_eq!(config.task.sector_kind, SectorKind::DaeSector);
        assert_eq!(config.route.len(), 3);
        assert!(matches!(
            config.route[1].aat,
            Some(AatRegionConfig::Sector { start_radial, .. }) if start_radial == 300.0
        ));
        assert!(matches!(
            config.route[2].aat,
            Some(AatRegionConfig::Circle { radius }) if radius == 10000.0
        ));
    }

    #[test]
    fn validation_rejects_bad_routes() {
        let mut config: PlannerConfig =
            serde_yaml::from_str("route:\n  - name: A\n    aat: { kind: circle, radius: 0 }\n")
                .expect("parse");
        assert!(config.validate().is_err());

        config.route[0].aat = None;
        assert!(config.validate().is_ok());

        config.route = (0..=MAX_TASK_POINTS)
            .map(|i| RouteEntry {
                name: format!("WP{i}"),
                aat: None,
            })
            .collect();
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_codes_round_trip() {
        for kind in [StartKind::Cylinder, StartKind::Line, StartKind::Sector] {
            assert_eq!(StartKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(AutoAdvance::from_code(3), Some(AutoAdvance::ArmStart));
        assert_eq!(SectorKind::from_code(7), None);
    }
}
