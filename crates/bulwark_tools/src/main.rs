//! Bulwark - Development Tools

use std::path::{Path, PathBuf};

use bulwark_core::arena::Arena;
use bulwark_core::config::{ScoringConfig, ShieldConfig};
use bulwark_core::math::Fixed;
use bulwark_core::targeting::TargetSearchParams;
use bulwark_tools::probe::{probe, ProbeRequest};
use bulwark_tools::scenario::{fire, parse_flags, select, FireRequest};
use bulwark_tools::validate::{validate_data_directory, validate_file, DataKind};
use bulwark_tools::{parse_point, read_text, ToolResult};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bulwark-tools")]
#[command(about = "Development tools for the Bulwark interception and targeting core")]
struct Cli {
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a RON file or every RON file in a directory
    Validate {
        /// File or directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
        /// File kind; guessed from the file name when omitted
        #[arg(long, value_enum)]
        kind: Option<DataKind>,
    },
    /// Intersect a segment with a circle
    Probe {
        /// Segment start, as x,z or x,y,z
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        /// Segment end
        #[arg(long, allow_hyphen_values = true)]
        to: String,
        /// Circle center
        #[arg(long, allow_hyphen_values = true)]
        center: String,
        /// Circle radius
        #[arg(long)]
        radius: f64,
        /// Also catch the exit crossing beyond the segment end
        #[arg(long)]
        catch_outbound: bool,
        /// Solve in 3D instead of ignoring height
        #[arg(long)]
        spherical: bool,
    },
    /// Pick attack targets in a scenario
    Select {
        /// Scenario file
        scenario: PathBuf,
        /// Searcher entity id
        #[arg(long)]
        searcher: u64,
        /// Number of picks
        #[arg(long, default_value_t = 1)]
        picks: u32,
        /// RNG seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Scan flags, comma separated (e.g. need_los_to_all,need_threat)
        #[arg(long, value_delimiter = ',')]
        flags: Vec<String>,
        /// Maximum target distance
        #[arg(long)]
        max_dist: Option<f64>,
        /// Always use the ranged search
        #[arg(long)]
        only_ranged: bool,
        /// Scoring constants
        #[arg(long)]
        scoring: Option<PathBuf>,
    },
    /// Fly a projectile through a scenario's shields
    Fire {
        /// Scenario file
        scenario: PathBuf,
        /// Launch point
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        /// Aim point
        #[arg(long, allow_hyphen_values = true)]
        to: String,
        /// Launcher entity id
        #[arg(long)]
        launcher: Option<u64>,
        /// Entity hit on arrival
        #[arg(long)]
        victim: Option<u64>,
        /// Damage carried
        #[arg(long, default_value_t = 10)]
        damage: u32,
        /// Overhead flight
        #[arg(long)]
        overhead: bool,
        /// Shield constants
        #[arg(long)]
        shields: Option<PathBuf>,
    },
}

fn print_report<T: Serialize + std::fmt::Debug>(json: bool, report: &T) -> ToolResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report:#?}");
    }
    Ok(())
}

fn load_arena(path: &Path) -> ToolResult<Arena> {
    Ok(Arena::from_ron_str(&read_text(path)?)?)
}

fn run(cli: Cli) -> ToolResult<bool> {
    match cli.command {
        Commands::Validate { path, kind } => {
            tracing::info!("Validating data files in: {}", path.display());
            let reports = if path.is_dir() {
                validate_data_directory(&path)?
            } else {
                vec![validate_file(&path, kind)?]
            };
            print_report(cli.json, &reports)?;
            Ok(reports.iter().all(|r| r.is_ok()))
        }
        Commands::Probe {
            from,
            to,
            center,
            radius,
            catch_outbound,
            spherical,
        } => {
            let request = ProbeRequest {
                from: parse_point(&from)?,
                to: parse_point(&to)?,
                center: parse_point(&center)?,
                radius: Fixed::from_num(radius),
                catch_outbound,
                spherical,
            };
            print_report(cli.json, &probe(&request))?;
            Ok(true)
        }
        Commands::Select {
            scenario,
            searcher,
            picks,
            seed,
            flags,
            max_dist,
            only_ranged,
            scoring,
        } => {
            let arena = load_arena(&scenario)?;
            let config = match scoring {
                Some(path) => ScoringConfig::from_ron_str(&read_text(&path)?)?,
                None => ScoringConfig::default(),
            };
            let mut params = TargetSearchParams::default().with_flags(parse_flags(&flags)?);
            if let Some(max_dist) = max_dist {
                params = params.with_max_dist(Fixed::from_num(max_dist));
            }
            params.only_ranged = only_ranged;

            let report = select(&arena, &config, searcher, &params, picks, seed)?;
            print_report(cli.json, &report)?;
            Ok(true)
        }
        Commands::Fire {
            scenario,
            from,
            to,
            launcher,
            victim,
            damage,
            overhead,
            shields,
        } => {
            let arena = load_arena(&scenario)?;
            let config = match shields {
                Some(path) => ShieldConfig::from_ron_str(&read_text(&path)?)?,
                None => ShieldConfig::default(),
            };
            let request = FireRequest {
                launcher,
                origin: parse_point(&from)?,
                destination: parse_point(&to)?,
                damage,
                overhead,
                victim,
            };
            print_report(cli.json, &fire(&arena, &config, &request))?;
            Ok(true)
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!("Validation failed");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}
