//! CPA Risk CLI
//!
//! Filters each tracked target's reports and flags collision risk against
//! own ship.
//!
//! Usage:
//!   cpa-risk data/tracks.csv --own-speed 20 --own-course 30 \
//!            --json-out data/cpa_results.json

use anyhow::Result;
use clap::{Parser, ValueEnum};
use collision_avoidance::{EstimationMode, NoiseModel, Ownship, TrackProcessor, Vec2};
use cpa_risk::{
    loader, parse_variance, radar, report, RiskDocument, DEFAULT_OWN_COURSE_DEG,
    DEFAULT_OWN_SPEED,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Kalman-filtered final state per track
    Filtered,
    /// Latest raw report per track, no filtering
    Raw,
}

impl From<Mode> for EstimationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Filtered => EstimationMode::Filtered,
            Mode::Raw => EstimationMode::Raw,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cpa-risk",
    about = "Assess collision risk of tracked targets against own ship"
)]
struct Args {
    /// Time-series CSV: time,id,x,y,speed,course
    csv: PathBuf,

    /// Own ship speed (m/s)
    #[arg(long, default_value_t = DEFAULT_OWN_SPEED, allow_negative_numbers = true)]
    own_speed: f64,

    /// Own ship course (degrees, counter-clockwise from +x)
    #[arg(long, default_value_t = DEFAULT_OWN_COURSE_DEG, allow_negative_numbers = true)]
    own_course: f64,

    /// Own ship x position (m)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    own_x: f64,

    /// Own ship y position (m)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    own_y: f64,

    /// Write results as JSON to this file
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Skip the ASCII radar view
    #[arg(long)]
    no_radar: bool,

    /// State fed to the CPA solver
    #[arg(long, value_enum, default_value_t = Mode::Filtered)]
    mode: Mode,

    /// Measurement noise variance (R diagonal)
    #[arg(
        long,
        default_value_t = collision_avoidance::kalman::MEASUREMENT_NOISE_VARIANCE,
        value_parser = parse_variance
    )]
    measurement_noise: f64,

    /// Process noise variance (Q diagonal)
    #[arg(
        long,
        default_value_t = collision_avoidance::kalman::PROCESS_NOISE_VARIANCE,
        value_parser = parse_variance
    )]
    process_noise: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let loaded = loader::load_timeseries(&args.csv)?;

    let ownship = Ownship::new(
        Vec2::new(args.own_x, args.own_y),
        args.own_speed,
        args.own_course,
    );
    let noise = NoiseModel::new(args.process_noise, args.measurement_noise);
    let processor = TrackProcessor::new(ownship, noise).with_mode(args.mode.into());

    let own = processor.ownship();
    let mode = processor.mode();
    info!(
        "Own ship at ({:.1}, {:.1}) moving ({:.2}, {:.2}) m/s, mode {:?}",
        own.position.x, own.position.y, own.velocity.x, own.velocity.y, mode
    );

    let outcomes = processor.process_all(&loaded.series);

    println!("{}", report::render_table(&outcomes, mode));

    if !args.no_radar {
        print!("{}", radar::render_radar(&outcomes, own.position));
        println!();
    }

    if let Some(path) = &args.json_out {
        let document = RiskDocument::build(&loaded.series, &outcomes, own, mode);
        report::write_json(path, &document)?;
    }

    Ok(())
}
