//! Constant-velocity Kalman filter
//!
//! State vector `[x, y, vx, vy]`, position-only observations. All algebra is
//! done on fixed-size arrays so every track step is allocation-free and the
//! summation order is deterministic.
//!
//! ```text
//! predict:  x' = F(dt)·x            P' = F·P·Fᵗ + Q
//! update:   y = z − H·x             S = H·P·Hᵗ + R
//!           K = P·Hᵗ·S⁻¹            x ← x + K·y      P ← (I − K·H)·P
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::Vec2;

/// Process noise variance (diagonal of Q)
pub const PROCESS_NOISE_VARIANCE: f64 = 0.1;

/// Measurement noise variance (diagonal of R), i.e. σ = 5 m
pub const MEASUREMENT_NOISE_VARIANCE: f64 = 25.0;

/// Initial covariance diagonal `{x, y, vx, vy}`
pub const INITIAL_COVARIANCE_DIAGONAL: [f64; 4] = [10.0, 10.0, 100.0, 100.0];

/// Below this |det(S)| the update is skipped
pub const INNOVATION_DET_EPSILON: f64 = 1e-9;

pub type Mat4 = [[f64; 4]; 4];
pub type Mat2 = [[f64; 2]; 2];

/// Observation model: selects position from the state
const H: [[f64; 4]; 2] = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];

/// Dense product of two fixed-size matrices
pub fn matmul<const R: usize, const K: usize, const C: usize>(
    a: &[[f64; K]; R],
    b: &[[f64; C]; K],
) -> [[f64; C]; R] {
    let mut out = [[0.0; C]; R];
    for i in 0..R {
        for j in 0..C {
            for k in 0..K {
                out[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    out
}

pub fn transpose<const R: usize, const C: usize>(m: &[[f64; C]; R]) -> [[f64; R]; C] {
    let mut out = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            out[j][i] = m[i][j];
        }
    }
    out
}

fn matvec<const R: usize, const C: usize>(m: &[[f64; C]; R], v: &[f64; C]) -> [f64; R] {
    let mut out = [0.0; R];
    for i in 0..R {
        for j in 0..C {
            out[i] += m[i][j] * v[j];
        }
    }
    out
}

fn diagonal4(d: [f64; 4]) -> Mat4 {
    let mut m = [[0.0; 4]; 4];
    for i in 0..4 {
        m[i][i] = d[i];
    }
    m
}

pub fn det2(m: &Mat2) -> f64 {
    m[0][0] * m[1][1] - m[0][1] * m[1][0]
}

/// Adjugate inverse of a 2×2 matrix, `None` when |det| is below
/// [`INNOVATION_DET_EPSILON`]
pub fn invert2(m: &Mat2) -> Option<Mat2> {
    let det = det2(m);
    if det.abs() < INNOVATION_DET_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [m[1][1] * inv_det, -m[0][1] * inv_det],
        [-m[1][0] * inv_det, m[0][0] * inv_det],
    ])
}

/// Constant-velocity transition over `dt` seconds
pub fn transition(dt: f64) -> Mat4 {
    [
        [1.0, 0.0, dt, 0.0],
        [0.0, 1.0, 0.0, dt],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn trace4(m: &Mat4) -> f64 {
    m[0][0] + m[1][1] + m[2][2] + m[3][3]
}

/// Noise tuning shared by every filter in a batch.
///
/// Injected at construction so alternative tunings can be run side by side;
/// `Default` is the fixed process model every track uses in production.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    /// Diagonal of Q (unmodelled acceleration)
    pub process_variance: f64,
    /// Diagonal of R (sensor position noise)
    pub measurement_variance: f64,
    /// Diagonal of P after `initialize`
    pub initial_covariance: [f64; 4],
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            process_variance: PROCESS_NOISE_VARIANCE,
            measurement_variance: MEASUREMENT_NOISE_VARIANCE,
            initial_covariance: INITIAL_COVARIANCE_DIAGONAL,
        }
    }
}

impl NoiseModel {
    pub fn new(process_variance: f64, measurement_variance: f64) -> Self {
        Self {
            process_variance,
            measurement_variance,
            ..Self::default()
        }
    }

    fn q(&self) -> Mat4 {
        diagonal4([self.process_variance; 4])
    }

    fn r(&self) -> Mat2 {
        [
            [self.measurement_variance, 0.0],
            [0.0, self.measurement_variance],
        ]
    }
}

/// Filtered position and velocity of one track
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl KinematicState {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            vx: velocity.x,
            vy: velocity.y,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.vx, self.vy)
    }

    fn from_array(a: [f64; 4]) -> Self {
        Self {
            x: a[0],
            y: a[1],
            vx: a[2],
            vy: a[3],
        }
    }
}

/// Outcome of a single [`KalmanFilter::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Innovation covariance was singular; state and covariance untouched
    SkippedDegenerate,
}

/// Constant-velocity Kalman filter for one track
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    x: [f64; 4],
    p: Mat4,
    q: Mat4,
    r: Mat2,
    initial_covariance: [f64; 4],
    initialized: bool,
}

impl KalmanFilter {
    /// Uninitialized filter; call [`KalmanFilter::initialize`] before use
    pub fn new(noise: NoiseModel) -> Self {
        Self {
            x: [0.0; 4],
            p: [[0.0; 4]; 4],
            q: noise.q(),
            r: noise.r(),
            initial_covariance: noise.initial_covariance,
            initialized: false,
        }
    }

    /// Set the state and reset covariance to the initial diagonal
    pub fn initialize(&mut self, x0: f64, y0: f64, vx0: f64, vy0: f64) {
        self.x = [x0, y0, vx0, vy0];
        self.p = diagonal4(self.initial_covariance);
        self.initialized = true;
    }

    /// Advance the belief by `dt` seconds.
    ///
    /// Negative `dt` is treated as zero: the mean is unchanged but Q is still
    /// added once.
    pub fn predict(&mut self, dt: f64) {
        debug_assert!(self.initialized, "predict on uninitialized filter");
        let dt = dt.max(0.0);
        let f = transition(dt);

        self.x = matvec(&f, &self.x);

        let fp = matmul(&f, &self.p);
        let fpft = matmul(&fp, &transpose(&f));
        for i in 0..4 {
            for j in 0..4 {
                self.p[i][j] = fpft[i][j] + self.q[i][j];
            }
        }
    }

    /// Fold in one position observation
    pub fn update(&mut self, zx: f64, zy: f64) -> UpdateOutcome {
        debug_assert!(self.initialized, "update on uninitialized filter");
        let hx = matvec(&H, &self.x);
        let innovation = [zx - hx[0], zy - hx[1]];

        let ht = transpose(&H);
        let hpht = matmul(&matmul(&H, &self.p), &ht);
        let s = [
            [hpht[0][0] + self.r[0][0], hpht[0][1] + self.r[0][1]],
            [hpht[1][0] + self.r[1][0], hpht[1][1] + self.r[1][1]],
        ];

        // Singular S: leave the estimate as it was
        let Some(s_inv) = invert2(&s) else {
            trace!(det = det2(&s), "innovation covariance singular, update skipped");
            return UpdateOutcome::SkippedDegenerate;
        };

        let gain = matmul(&matmul(&self.p, &ht), &s_inv);

        for i in 0..4 {
            for j in 0..2 {
                self.x[i] += gain[i][j] * innovation[j];
            }
        }

        let kh = matmul(&gain, &H);
        let mut i_kh = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                let identity = if i == j { 1.0 } else { 0.0 };
                i_kh[i][j] = identity - kh[i][j];
            }
        }
        self.p = matmul(&i_kh, &self.p);

        UpdateOutcome::Applied
    }

    pub fn state(&self) -> KinematicState {
        KinematicState::from_array(self.x)
    }

    pub fn covariance(&self) -> &Mat4 {
        &self.p
    }
}
