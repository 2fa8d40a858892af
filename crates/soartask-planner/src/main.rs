/*
[INPUT]:  CLI arguments, YAML configuration file, task files
[OUTPUT]: Planned task files and task summaries on stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use soartask_geo::{GeoPoint, WaypointDatabase};
use soartask_planner::planner::TaskSummary;
use soartask_planner::{AbortRequest, Planner, PlannerConfig};

#[derive(Parser, Debug)]
#[command(name = "soartask", version, about = "Glide task planner and AAT geometry engine")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[arg(long = "dry-run")]
    dry_run: bool,
    /// Print task summaries as JSON
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the configured route and write it as a task file
    Plan {
        #[arg(long, value_name = "PATH", default_value = "Default.tsk")]
        output: PathBuf,
    },
    /// Load a task file and print its legs and targets
    Show {
        #[arg(long, value_name = "PATH")]
        task: PathBuf,
    },
    /// Abort the configured task at a position and print the landing choice
    Abort {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    info!(
        config_path = %args.config_path.display(),
        dry_run = args.dry_run,
        "starting soartask"
    );

    let config = load_config(&args.config_path)?;
    info!(
        waypoints = config.waypoints.len(),
        route = config.route.len(),
        "configuration loaded"
    );

    let planner = Planner::from_config(&config).context("build planner")?;

    if args.dry_run {
        planner.plan_route(&config.route).context("plan route")?;
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    match args.command {
        Some(Command::Plan { output }) => {
            planner.plan_route(&config.route).context("plan route")?;
            planner
                .store
                .save_task(&output)
                .with_context(|| format!("save task to {}", output.display()))?;
            print_task(&planner, args.json)?;
        }
        Some(Command::Show { task }) => {
            planner
                .store
                .load_task(&task)
                .with_context(|| format!("load task from {}", task.display()))?;
            print_task(&planner, args.json)?;
        }
        Some(Command::Abort {
            latitude,
            longitude,
        }) => {
            planner.plan_route(&config.route).context("plan route")?;
            planner
                .store
                .update_aircraft_position(GeoPoint::new(latitude, longitude));
            let mode = planner.store.toggle_abort(AbortRequest::Abort);
            let landing = planner
                .store
                .abort_destination()
                .and_then(|index| planner.waypoints.get(index));
            match landing {
                Some(waypoint) => println!("{mode:?}: land at {}", waypoint.name),
                None => println!("{mode:?}: no landable waypoint known"),
            }
            let mode = planner.store.toggle_abort(AbortRequest::Resume);
            println!("{mode:?}: task restored");
        }
        None => {
            planner.plan_route(&config.route).context("plan route")?;
            print_task(&planner, args.json)?;
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &Path) -> Result<PlannerConfig> {
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    PlannerConfig::from_file(path_str).context("load config")
}

fn print_task(planner: &Planner, json: bool) -> Result<()> {
    let summary = TaskSummary::from_state(&planner.store.snapshot(), planner.waypoints.as_ref());
    if json {
        let payload = serde_json::to_string_pretty(&summary).context("serialize task summary")?;
        println!("{payload}");
        return Ok(());
    }

    println!(
        "task: {} points, {:.1} km, AAT {}",
        summary.points.len(),
        summary.total_distance / 1000.0,
        if summary.aat_enabled { "on" } else { "off" }
    );
    for point in &summary.points {
        println!(
            "{:>2} {:<20} leg {:>7.1} km  in {:>5.1}  target {:.5},{:.5}  isoline {}",
            point.slot,
            point.name,
            point.leg_distance / 1000.0,
            point.inbound_bearing,
            point.target.latitude,
            point.target.longitude,
            point.isoline_points,
        );
    }
    Ok(())
}
