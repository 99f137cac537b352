//! CPA Risk Reporting
//!
//! Loads tracked-target time series, runs them through the
//! `collision-avoidance` estimator and CPA solver, and presents the verdicts
//! as a console table, a JSON document and an ASCII radar view.
//!
//! # Input
//!
//! ```text
//! time,id,x,y,speed,course
//! 0,1,100,50,5,180
//! 1,1,95,50,5,180
//! 2,1,90,50,5,180
//! ```
//!
//! Course is in degrees counter-clockwise from +x; positions in metres,
//! speed in m/s, time in seconds.

use thiserror::Error;

pub mod loader;
pub mod radar;
pub mod report;

pub use loader::{load_timeseries, read_timeseries, LoadReport};
pub use radar::{render_radar, RADAR_GRID_SIZE};
pub use report::{render_table, write_json, RiskDocument};

/// Columns expected in every record
pub const EXPECTED_COLUMNS: usize = 6;

/// Default own-ship speed (m/s)
pub const DEFAULT_OWN_SPEED: f64 = 20.0;

/// Default own-ship course (degrees)
pub const DEFAULT_OWN_COURSE_DEG: f64 = 30.0;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Empty file or missing header")]
    MissingHeader,
    #[error("No tracks loaded")]
    NoTracks,
}

pub type Result<T> = std::result::Result<T, RiskError>;

/// Parse a noise variance from the command line: finite and non-negative
pub fn parse_variance(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", s))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("variance must be finite and >= 0, got {}", value));
    }
    Ok(value)
}
