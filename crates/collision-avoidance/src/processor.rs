//! Per-track orchestration
//!
//! Each identity gets its own [`KalmanFilter`], is run through its
//! measurements in time order, and the final estimate is fed to the CPA
//! solver together with the shared own-ship state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::cpa::{compute_cpa, CpaResult};
use crate::error::{CollisionError, Result};
use crate::geometry::{course_to_velocity, Vec2};
use crate::kalman::{KalmanFilter, KinematicState, NoiseModel, UpdateOutcome};

/// One timestamped report for a tracked identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Seconds
    pub time: f64,
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    /// Degrees, counter-clockwise from +x
    pub course: f64,
}

impl Measurement {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Vec2 {
        course_to_velocity(self.speed, self.course)
    }
}

/// Identity → measurements sorted by ascending time
pub type TrackSeries = BTreeMap<String, Vec<Measurement>>;

/// Observer position and velocity, shared read-only by every track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ownship {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Ownship {
    pub fn new(position: Vec2, speed: f64, course_deg: f64) -> Self {
        Self {
            position,
            velocity: course_to_velocity(speed, course_deg),
        }
    }

    /// Own ship at the origin
    pub fn at_origin(speed: f64, course_deg: f64) -> Self {
        Self::new(Vec2::ZERO, speed, course_deg)
    }
}

/// How the per-track state fed to the CPA solver is obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMode {
    /// Kalman-filtered final state
    #[default]
    Filtered,
    /// Latest raw report, velocity from its speed/course
    Raw,
}

/// Final state and risk verdict for one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackOutcome {
    pub id: String,
    pub state: KinematicState,
    pub cpa: CpaResult,
    pub measurements_used: usize,
    /// Updates skipped because the innovation covariance was singular
    pub degenerate_updates: usize,
}

/// Runs the estimator and CPA solver over a batch of tracks
#[derive(Debug, Clone)]
pub struct TrackProcessor {
    ownship: Ownship,
    noise: NoiseModel,
    mode: EstimationMode,
}

impl TrackProcessor {
    pub fn new(ownship: Ownship, noise: NoiseModel) -> Self {
        Self {
            ownship,
            noise,
            mode: EstimationMode::Filtered,
        }
    }

    pub fn with_mode(mut self, mode: EstimationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn ownship(&self) -> &Ownship {
        &self.ownship
    }

    pub fn mode(&self) -> EstimationMode {
        self.mode
    }

    /// Filter one track and assess it against own ship.
    ///
    /// `measurements` must be sorted by time; out-of-order steps are clamped
    /// to `dt = 0` rather than reordered.
    pub fn process_track(&self, id: &str, measurements: &[Measurement]) -> Result<TrackOutcome> {
        let (first, rest) = measurements
            .split_first()
            .ok_or_else(|| CollisionError::EmptyTrack(id.to_string()))?;

        let (state, degenerate_updates) = match self.mode {
            EstimationMode::Filtered => self.filter(first, rest),
            EstimationMode::Raw => {
                let last = rest.last().unwrap_or(first);
                (KinematicState::new(last.position(), last.velocity()), 0)
            }
        };

        let cpa = compute_cpa(
            self.ownship.position,
            self.ownship.velocity,
            state.position(),
            state.velocity(),
        );

        debug!(
            track = id,
            x = state.x,
            y = state.y,
            vx = state.vx,
            vy = state.vy,
            cpa_m = cpa.distance,
            tcpa_s = cpa.tcpa,
            status = %cpa.status(),
            "track assessed"
        );

        Ok(TrackOutcome {
            id: id.to_string(),
            state,
            cpa,
            measurements_used: measurements.len(),
            degenerate_updates,
        })
    }

    fn filter(&self, first: &Measurement, rest: &[Measurement]) -> (KinematicState, usize) {
        let mut kf = KalmanFilter::new(self.noise);
        let v0 = first.velocity();
        kf.initialize(first.x, first.y, v0.x, v0.y);

        let mut prev_time = first.time;
        let mut skipped = 0;
        for m in rest {
            let dt = (m.time - prev_time).max(0.0);
            kf.predict(dt);
            if kf.update(m.x, m.y) == UpdateOutcome::SkippedDegenerate {
                skipped += 1;
            }
            prev_time = m.time;
        }

        if skipped > 0 {
            warn!(
                track = %first.id,
                skipped,
                "innovation covariance was singular, some updates were not applied"
            );
        }

        (kf.state(), skipped)
    }

    /// Process every track in the series. Empty tracks are left out.
    pub fn process_all(&self, series: &TrackSeries) -> BTreeMap<String, TrackOutcome> {
        info!(tracks = series.len(), mode = ?self.mode, "processing tracks");

        #[cfg(feature = "parallel")]
        let outcomes = {
            use rayon::prelude::*;
            series
                .par_iter()
                .filter_map(|(id, seq)| self.keep_non_empty(id, seq))
                .collect::<BTreeMap<_, _>>()
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes = series
            .iter()
            .filter_map(|(id, seq)| self.keep_non_empty(id, seq))
            .collect::<BTreeMap<_, _>>();

        let at_risk = outcomes.values().filter(|o| o.cpa.collision_risk).count();
        info!(assessed = outcomes.len(), at_risk, "tracks assessed");

        outcomes
    }

    fn keep_non_empty(&self, id: &str, seq: &[Measurement]) -> Option<(String, TrackOutcome)> {
        match self.process_track(id, seq) {
            Ok(outcome) => Some((id.to_string(), outcome)),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpa::{CPA_THRESHOLD_METERS, TCPA_THRESHOLD_SECONDS};

    fn m(time: f64, id: &str, x: f64, y: f64, speed: f64, course: f64) -> Measurement {
        Measurement {
            time,
            id: id.to_string(),
            x,
            y,
            speed,
            course,
        }
    }

    fn reference_scenario() -> Vec<Measurement> {
        vec![
            m(0.0, "1", 100.0, 50.0, 5.0, 180.0),
            m(1.0, "1", 95.0, 50.0, 5.0, 180.0),
            m(2.0, "1", 90.0, 50.0, 5.0, 180.0),
        ]
    }

    #[test]
    fn test_end_to_end_scenario() {
        let ownship = Ownship::at_origin(20.0, 30.0);
        assert!((ownship.velocity.x - 17.320508075688775).abs() < 1e-9);
        assert!((ownship.velocity.y - 10.0).abs() < 1e-9);

        let processor = TrackProcessor::new(ownship, NoiseModel::default());
        let outcome = processor.process_track("1", &reference_scenario()).unwrap();

        let s = outcome.state;
        assert!((s.x - 90.0).abs() < 1e-6);
        assert!((s.y - 50.0).abs() < 1e-6);
        assert!((s.vx + 5.0).abs() < 1e-6);
        assert!(s.vy.abs() < 1e-6);

        // Closed form from the filtered state
        let rx = s.x - ownship.position.x;
        let ry = s.y - ownship.position.y;
        let vx = s.vx - ownship.velocity.x;
        let vy = s.vy - ownship.velocity.y;
        let tcpa = -(rx * vx + ry * vy) / (vx * vx + vy * vy);
        let dist = ((rx + vx * tcpa).powi(2) + (ry + vy * tcpa).powi(2)).sqrt();

        let cpa = outcome.cpa;
        assert!(cpa.valid);
        assert!((cpa.tcpa - tcpa).abs() < 1e-9);
        assert!((cpa.distance - dist).abs() < 1e-9);
        assert!((cpa.tcpa - 4.194).abs() < 1e-3);
        assert!((cpa.distance - 8.832).abs() < 1e-3);
        assert!(cpa.closing);
        assert_eq!(
            cpa.collision_risk,
            dist < CPA_THRESHOLD_METERS && tcpa < TCPA_THRESHOLD_SECONDS
        );
        assert!(cpa.collision_risk);
        assert_eq!(outcome.measurements_used, 3);
        assert_eq!(outcome.degenerate_updates, 0);
    }

    #[test]
    fn test_single_measurement_uses_initial_state() {
        let processor = TrackProcessor::new(Ownship::at_origin(0.0, 0.0), NoiseModel::default());
        let outcome = processor
            .process_track("solo", &[m(5.0, "solo", 10.0, -20.0, 2.0, 90.0)])
            .unwrap();
        assert_eq!(outcome.state.x, 10.0);
        assert_eq!(outcome.state.y, -20.0);
        assert!(outcome.state.vx.abs() < 1e-12);
        assert!((outcome.state.vy - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_track_is_error() {
        let processor = TrackProcessor::new(Ownship::at_origin(0.0, 0.0), NoiseModel::default());
        assert_eq!(
            processor.process_track("ghost", &[]),
            Err(CollisionError::EmptyTrack("ghost".to_string()))
        );
    }

    #[test]
    fn test_backwards_time_clamped() {
        let processor = TrackProcessor::new(Ownship::at_origin(0.0, 0.0), NoiseModel::default());
        let forward = vec![
            m(0.0, "a", 0.0, 0.0, 1.0, 0.0),
            m(1.0, "a", 1.0, 0.0, 1.0, 0.0),
            m(1.0, "a", 1.0, 0.0, 1.0, 0.0),
        ];
        let mut backward = forward.clone();
        backward[2].time = 0.5;

        let a = processor.process_track("a", &forward).unwrap();
        let b = processor.process_track("a", &backward).unwrap();
        assert_eq!(a.state, b.state);
    }

    #[test]
    fn test_raw_mode_uses_latest_report() {
        let processor = TrackProcessor::new(Ownship::at_origin(20.0, 30.0), NoiseModel::default())
            .with_mode(EstimationMode::Raw);
        assert_eq!(processor.mode(), EstimationMode::Raw);
        assert!((processor.ownship().velocity.y - 10.0).abs() < 1e-9);

        let outcome = processor.process_track("1", &reference_scenario()).unwrap();
        assert_eq!(outcome.state.x, 90.0);
        assert_eq!(outcome.state.y, 50.0);
        assert!((outcome.state.vx + 5.0).abs() < 1e-12);
        assert_eq!(outcome.degenerate_updates, 0);
    }

    #[test]
    fn test_degenerate_updates_counted() {
        let noise = NoiseModel {
            process_variance: 0.0,
            measurement_variance: 0.0,
            initial_covariance: [0.0, 0.0, 100.0, 100.0],
        };
        let processor = TrackProcessor::new(Ownship::at_origin(0.0, 0.0), noise);
        let track = vec![
            m(0.0, "d", 0.0, 0.0, 0.0, 0.0),
            m(0.0, "d", 10.0, 10.0, 0.0, 0.0),
        ];
        let outcome = processor.process_track("d", &track).unwrap();
        assert_eq!(outcome.degenerate_updates, 1);
        assert_eq!(outcome.state.x, 0.0);
        assert_eq!(outcome.state.y, 0.0);
    }

    #[test]
    fn test_process_all_skips_empty_tracks() {
        let mut series = TrackSeries::new();
        series.insert("1".to_string(), reference_scenario());
        series.insert("2".to_string(), Vec::new());
        series.insert(
            "3".to_string(),
            vec![m(0.0, "3", -500.0, -500.0, 17.320508075688775, 30.0)],
        );

        let processor = TrackProcessor::new(Ownship::at_origin(20.0, 30.0), NoiseModel::default());
        let outcomes = processor.process_all(&series);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains_key("1"));
        assert!(!outcomes.contains_key("2"));
        assert!(outcomes["1"].cpa.collision_risk);
        assert!(!outcomes["3"].cpa.collision_risk);
    }

    #[test]
    fn test_tracks_are_independent() {
        let processor = TrackProcessor::new(Ownship::at_origin(20.0, 30.0), NoiseModel::default());
        let alone = processor.process_track("1", &reference_scenario()).unwrap();

        let mut series = TrackSeries::new();
        series.insert("0".to_string(), vec![m(0.0, "0", 1.0, 1.0, 1.0, 1.0)]);
        series.insert("1".to_string(), reference_scenario());
        series.insert("2".to_string(), vec![m(3.0, "2", 7.0, 7.0, 7.0, 7.0)]);
        let together = processor.process_all(&series);

        assert_eq!(together["1"], alone);
    }
}
