//! CPA/TCPA calculation
//!
//! Closed-form closest point of approach between two objects moving with
//! constant velocity:
//!
//! ```text
//! r = p_tgt − p_own        v = v_tgt − v_own
//! tcpa = −(r·v) / |v|²     cpa = |r + v·tcpa|
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Vec2;

/// Separation below which a closing target is a collision risk (m)
pub const CPA_THRESHOLD_METERS: f64 = 50.0;

/// TCPA below which a closing target is a collision risk (s)
pub const TCPA_THRESHOLD_SECONDS: f64 = 30.0;

/// |v|² below which relative motion is treated as absent
pub const RELATIVE_MOTION_EPSILON: f64 = 1e-9;

/// Result of CPA/TCPA calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpaResult {
    /// Separation at closest approach, or current separation when not `valid`
    pub distance: f64,
    /// Time to closest approach in seconds.
    /// Positive = future, negative = past
    pub tcpa: f64,
    pub collision_risk: bool,
    pub closing: bool,
    /// `false` when there is no relative motion and no projection was made
    pub valid: bool,
}

impl CpaResult {
    pub fn status(&self) -> CpaStatus {
        if !self.valid {
            CpaStatus::NoRelativeMotion
        } else if !self.closing {
            CpaStatus::Diverging
        } else if self.collision_risk {
            CpaStatus::CollisionRisk
        } else {
            CpaStatus::Safe
        }
    }
}

/// Presentation category of a [`CpaResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpaStatus {
    NoRelativeMotion,
    Diverging,
    CollisionRisk,
    Safe,
}

impl CpaStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoRelativeMotion => "No relative motion",
            Self::Diverging => "Diverging",
            Self::CollisionRisk => "COLLISION RISK",
            Self::Safe => "Safe",
        }
    }
}

impl fmt::Display for CpaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calculate CPA and TCPA of a target relative to own ship
pub fn compute_cpa(own_pos: Vec2, own_vel: Vec2, tgt_pos: Vec2, tgt_vel: Vec2) -> CpaResult {
    let r = tgt_pos - own_pos;
    let v = tgt_vel - own_vel;

    let v2 = v.norm_squared();
    if v2 < RELATIVE_MOTION_EPSILON {
        return CpaResult {
            distance: r.norm(),
            tcpa: 0.0,
            collision_risk: false,
            closing: false,
            valid: false,
        };
    }

    let tcpa = -r.dot(v) / v2;
    let distance = (r + v * tcpa).norm();

    let closing = tcpa >= 0.0;
    let collision_risk =
        closing && distance < CPA_THRESHOLD_METERS && tcpa < TCPA_THRESHOLD_SECONDS;

    CpaResult {
        distance,
        tcpa,
        collision_risk,
        closing,
        valid: true,
    }
}
