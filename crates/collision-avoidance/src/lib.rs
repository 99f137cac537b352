//! Collision Avoidance Library
//!
//! Track smoothing and collision risk assessment against own ship.
//!
//! # Pipeline
//!
//! ```text
//! measurements (per identity, time-sorted)
//!     → KalmanFilter (constant velocity, predict/update per report)
//!     → filtered [x, y, vx, vy]
//!     → compute_cpa(own ship, target)
//!     → CpaResult { distance, tcpa, collision_risk, closing, valid }
//! ```
//!
//! | Constant | Value | Meaning |
//! |----------|-------|---------|
//! | CPA threshold | 50.0 m | closest approach considered dangerous |
//! | TCPA threshold | 30.0 s | horizon for flagging risk |
//! | relative-motion ε | 1e-9 | below this \|v\|² no CPA is projected |
//! | R | 25.0 | measurement variance (σ = 5 m) |
//! | Q | 0.1 | process variance |
//! | P₀ | {10, 10, 100, 100} | initial covariance diagonal |
//!
//! Tracks are independent. With the `parallel` feature the batch is fanned
//! out over rayon's pool and joined into the same ordered map.

pub mod cpa;
pub mod error;
pub mod geometry;
pub mod kalman;
pub mod processor;

pub use cpa::{
    compute_cpa, CpaResult, CpaStatus, CPA_THRESHOLD_METERS, RELATIVE_MOTION_EPSILON,
    TCPA_THRESHOLD_SECONDS,
};
pub use error::{CollisionError, Result};
pub use geometry::{course_to_velocity, Vec2};
pub use kalman::{KalmanFilter, KinematicState, NoiseModel, UpdateOutcome};
pub use processor::{EstimationMode, Measurement, Ownship, TrackOutcome, TrackProcessor, TrackSeries};
