//! Gradient-descent MARG orientation filter
//!
//! Implementation of Sebastian Madgwick's IMU/MARG sensor fusion
//! algorithm: the orientation quaternion is advanced by gyroscope
//! integration and corrected along the negative gradient of an
//! accelerometer-gravity / magnetometer-flux misalignment objective.
//! The filter additionally tracks gyroscope bias drift and a reference
//! magnetic flux model that co-evolves with the orientation estimate.
//!
//! Reported Euler angles are relative to an auxiliary reference frame
//! captured at the first update, so "zero" is the pose the body had when
//! fusion started, not the sensor's arbitrary internal frame.
//!
//! All math is IEEE double precision.

use nalgebra::{Quaternion, Vector3};

/// Filter tuning parameters.
///
/// `beta` (from the measurement error) weighs how much the
/// accelerometer/magnetometer correction is trusted over the gyroscope;
/// `zeta` (from the drift rate) sets how fast the gyro bias estimate
/// converges, at the cost of coupling magnetometer noise into it.
#[derive(Debug, Clone, Copy)]
pub struct MargConfig {
    /// Fixed nominal fusion period in seconds.
    pub sample_period_s: f64,

    /// Expected gyroscope measurement error, °/s.
    pub gyro_meas_error_dps: f64,

    /// Expected gyroscope drift, °/s/s. Zero disables drift tracking.
    pub gyro_meas_drift_dps: f64,
}

impl Default for MargConfig {
    fn default() -> Self {
        Self {
            sample_period_s: 0.1,
            // At rest the ITG-3200 wanders roughly ±5 counts; at
            // ~14.375 LSB/(°/s) that is about 0.3 °/s of noise.
            gyro_meas_error_dps: 0.3,
            gyro_meas_drift_dps: 0.0,
        }
    }
}

/// Output orientation in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    /// Rotation about X (phi).
    pub roll: f64,

    /// Rotation about Y (theta).
    pub pitch: f64,

    /// Rotation about Z (psi).
    pub yaw: f64,
}

impl EulerAngles {
    pub const ZERO: Self = Self {
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
    };

    pub fn roll_deg(&self) -> f64 {
        self.roll.to_degrees()
    }

    pub fn pitch_deg(&self) -> f64 {
        self.pitch.to_degrees()
    }

    pub fn yaw_deg(&self) -> f64 {
        self.yaw.to_degrees()
    }
}

/// Quaternion components as `[w, x, y, z]`.
type Quat = [f64; 4];

const IDENTITY: Quat = [1.0, 0.0, 0.0, 0.0];

/// Madgwick MARG fusion filter.
///
/// Two states: uninitialized (before the first `update`) and tracking.
/// The transition captures the current estimate as the auxiliary
/// reference frame for [`MargFilter::euler_angles`].
#[derive(Debug, Clone)]
pub struct MargFilter {
    /// Estimated orientation of the sensor relative to the earth frame.
    seq: Quat,

    /// Auxiliary reference frame captured at the first update.
    aeq: Quat,

    /// Gyroscope bias estimate, rad/s.
    gyro_bias: Vector3<f64>,

    /// Reference flux components in the earth frame.
    b_x: f64,
    b_z: f64,

    initialized: bool,

    deltat: f64,
    beta: f64,
    zeta: f64,
}

impl MargFilter {
    pub fn new(config: MargConfig) -> Self {
        let scale = libm::sqrt(3.0 / 4.0) * core::f64::consts::PI / 180.0;

        Self {
            seq: IDENTITY,
            aeq: IDENTITY,
            gyro_bias: Vector3::zeros(),
            b_x: 1.0,
            b_z: 0.0,
            initialized: false,
            deltat: config.sample_period_s,
            beta: scale * config.gyro_meas_error_dps,
            zeta: scale * config.gyro_meas_drift_dps,
        }
    }

    /// Advance the orientation estimate by one fusion cycle.
    ///
    /// `gyro` in rad/s, `accel` in m/s², `mag` in arbitrary flux units;
    /// the latter two are used for direction only. If either measurement
    /// vector has zero norm (free fall, sensor fault, exact null), the
    /// gradient correction is skipped for this cycle and only
    /// bias-corrected gyro integration runs; degenerate input never
    /// produces NaN in the orientation state.
    pub fn update(&mut self, gyro: Vector3<f64>, accel: Vector3<f64>, mag: Vector3<f64>) {
        let accel_unit = unit(accel);
        let mag_unit = unit(mag);

        let correction = match (accel_unit, mag_unit) {
            (Some(a), Some(m)) => self.normalized_gradient(a, m),
            _ => None,
        };

        // Integrate the angular error into the gyro bias estimate, then
        // remove the bias from the measured rates. This continuous drift
        // compensation runs only when a usable gradient exists.
        if let Some(grad) = correction {
            let [q1, q2, q3, q4] = self.seq;
            let w_err_x = 2.0 * q1 * grad[1] - 2.0 * q2 * grad[0] - 2.0 * q3 * grad[3]
                + 2.0 * q4 * grad[2];
            let w_err_y = 2.0 * q1 * grad[2] + 2.0 * q2 * grad[3] - 2.0 * q3 * grad[0]
                - 2.0 * q4 * grad[1];
            let w_err_z = 2.0 * q1 * grad[3] - 2.0 * q2 * grad[2] + 2.0 * q3 * grad[1]
                - 2.0 * q4 * grad[0];

            self.gyro_bias.x += w_err_x * self.deltat * self.zeta;
            self.gyro_bias.y += w_err_y * self.deltat * self.zeta;
            self.gyro_bias.z += w_err_z * self.deltat * self.zeta;
        }
        let w = gyro - self.gyro_bias;

        // Quaternion rate from the bias-corrected rates: dq/dt = ½ q ⊗ ω.
        let [q1, q2, q3, q4] = self.seq;
        let mut dq1 = 0.5 * (-q2 * w.x - q3 * w.y - q4 * w.z);
        let mut dq2 = 0.5 * (q1 * w.x + q3 * w.z - q4 * w.y);
        let mut dq3 = 0.5 * (q1 * w.y - q2 * w.z + q4 * w.x);
        let mut dq4 = 0.5 * (q1 * w.z + q2 * w.y - q3 * w.x);

        // Blend in the corrective gradient, weighted by beta.
        if let Some(grad) = correction {
            dq1 -= self.beta * grad[0];
            dq2 -= self.beta * grad[1];
            dq3 -= self.beta * grad[2];
            dq4 -= self.beta * grad[3];
        }

        self.seq = [
            q1 + dq1 * self.deltat,
            q2 + dq2 * self.deltat,
            q3 + dq3 * self.deltat,
            q4 + dq4 * self.deltat,
        ];
        self.normalize_seq();

        // Refresh the earth-frame flux reference from the updated
        // estimate so the next cycle's magnetic residual uses it; flux
        // and orientation co-evolve.
        if correction.is_some() {
            if let Some(m) = mag_unit {
                self.update_flux_reference(m);
            }
        }

        if !self.initialized {
            // Anchor "zero" orientation to the pose at first update.
            self.aeq = self.seq;
            self.initialized = true;
        }
    }

    /// Return the filter to its uninitialized state. Idempotent.
    pub fn reset(&mut self) {
        self.seq = IDENTITY;
        self.aeq = IDENTITY;
        self.gyro_bias = Vector3::zeros();
        self.b_x = 1.0;
        self.b_z = 0.0;
        self.initialized = false;
    }

    /// Current orientation relative to the auxiliary reference frame,
    /// as roll/pitch/yaw in radians.
    pub fn euler_angles(&self) -> EulerAngles {
        let [s1, s2, s3, s4] = self.seq;
        let [a1, a2, a3, a4] = self.aeq;

        // Conjugate of the estimate, then the product with the auxiliary
        // frame quaternion.
        let (e1, e2, e3, e4) = (s1, -s2, -s3, -s4);
        let q1 = e1 * a1 - e2 * a2 - e3 * a3 - e4 * a4;
        let q2 = e1 * a2 + e2 * a1 + e3 * a4 - e4 * a3;
        let q3 = e1 * a3 - e2 * a4 + e3 * a1 + e4 * a2;
        let q4 = e1 * a4 + e2 * a3 - e3 * a2 + e4 * a1;

        let roll = libm::atan2(
            2.0 * q3 * q4 - 2.0 * q1 * q2,
            2.0 * q1 * q1 + 2.0 * q4 * q4 - 1.0,
        );
        let pitch = libm::asin(2.0 * q2 * q3 - 2.0 * q1 * q3);
        // NOTE: the 2·q2·q3 term below matches Madgwick's reference
        // listing, which reuses the pitch residual product here where a
        // standard ZYX extraction has 2·(q1·q4 + q2·q3). Kept verbatim so
        // headings match the algorithm this filter is adapted from; see
        // DESIGN.md ("yaw extraction").
        let yaw = libm::atan2(
            2.0 * q2 * q3 - 2.0 * q1 * q4,
            2.0 * q1 * q1 + 2.0 * q2 * q2 - 1.0,
        );

        EulerAngles { roll, pitch, yaw }
    }

    /// Estimated orientation quaternion (unit norm).
    pub fn quaternion(&self) -> Quaternion<f64> {
        let [w, x, y, z] = self.seq;
        Quaternion::new(w, x, y, z)
    }

    /// Auxiliary reference frame quaternion (identity until the first
    /// update).
    pub fn auxiliary_frame(&self) -> Quaternion<f64> {
        let [w, x, y, z] = self.aeq;
        Quaternion::new(w, x, y, z)
    }

    /// Current gyroscope bias estimate, rad/s.
    pub fn gyro_bias(&self) -> Vector3<f64> {
        self.gyro_bias
    }

    /// Whether the first update has run (auxiliary frame captured).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Objective function and Jacobian for gravity and flux alignment,
    /// contracted to the normalized gradient Jᵀf.
    ///
    /// Returns `None` when the gradient has zero norm (the estimate
    /// already matches both measurement vectors exactly), in which case
    /// the correction term is skipped for the cycle.
    fn normalized_gradient(&self, a: Vector3<f64>, m: Vector3<f64>) -> Option<Quat> {
        let [q1, q2, q3, q4] = self.seq;
        let (bx, bz) = (self.b_x, self.b_z);

        // Objective function: rows 1-3 gravity, rows 4-6 flux.
        let f1 = 2.0 * (q2 * q4 - q1 * q3) - a.x;
        let f2 = 2.0 * (q1 * q2 + q3 * q4) - a.y;
        let f3 = 1.0 - 2.0 * (q2 * q2 + q3 * q3) - a.z;
        let f4 = 2.0 * bx * (0.5 - q3 * q3 - q4 * q4) + 2.0 * bz * (q2 * q4 - q1 * q3) - m.x;
        let f5 = 2.0 * bx * (q2 * q3 - q1 * q4) + 2.0 * bz * (q1 * q2 + q3 * q4) - m.y;
        let f6 = 2.0 * bx * (q1 * q3 + q2 * q4) + 2.0 * bz * (0.5 - q2 * q2 - q3 * q3) - m.z;

        // Jacobian elements; shared terms keep the names from Madgwick's
        // report (J_11 also serves as J_24, etc.).
        let j11_24 = 2.0 * q3;
        let j12_23 = 2.0 * q4;
        let j13_22 = 2.0 * q1;
        let j14_21 = 2.0 * q2;
        let j32 = 2.0 * j14_21;
        let j33 = 2.0 * j11_24;
        let j41 = 2.0 * bz * q3;
        let j42 = 2.0 * bz * q4;
        let j43 = 4.0 * bx * q3 + 2.0 * bz * q1;
        let j44 = 4.0 * bx * q4 - 2.0 * bz * q2;
        let j51 = 2.0 * bx * q4 - 2.0 * bz * q2;
        let j52 = 2.0 * bx * q3 + 2.0 * bz * q1;
        let j53 = 2.0 * bx * q2 + 2.0 * bz * q4;
        let j54 = 2.0 * bx * q1 - 2.0 * bz * q3;
        let j61 = 2.0 * bx * q3;
        let j62 = 2.0 * bx * q4 - 4.0 * bz * q2;
        let j63 = 2.0 * bx * q1 - 4.0 * bz * q3;
        let j64 = 2.0 * bx * q2;

        // Gradient = Jᵀf (signs folded in per the report).
        let g1 = j14_21 * f2 - j11_24 * f1 - j41 * f4 - j51 * f5 + j61 * f6;
        let g2 = j12_23 * f1 + j13_22 * f2 - j32 * f3 + j42 * f4 + j52 * f5 + j62 * f6;
        let g3 = j12_23 * f2 - j33 * f3 - j13_22 * f1 - j43 * f4 + j53 * f5 + j63 * f6;
        let g4 = j14_21 * f1 + j11_24 * f2 - j44 * f4 - j54 * f5 + j64 * f6;

        let norm = libm::sqrt(g1 * g1 + g2 * g2 + g3 * g3 + g4 * g4);
        if norm == 0.0 {
            return None;
        }
        Some([g1 / norm, g2 / norm, g3 / norm, g4 / norm])
    }

    /// Recompute the earth-frame flux reference (b_x, b_z) from the
    /// updated quaternion and the normalized magnetometer vector.
    fn update_flux_reference(&mut self, m: Vector3<f64>) {
        let [q1, q2, q3, q4] = self.seq;

        let h_x = 2.0 * m.x * (0.5 - q3 * q3 - q4 * q4)
            + 2.0 * m.y * (q2 * q3 - q1 * q4)
            + 2.0 * m.z * (q2 * q4 + q1 * q3);
        let h_y = 2.0 * m.x * (q2 * q3 + q1 * q4)
            + 2.0 * m.y * (0.5 - q2 * q2 - q4 * q4)
            + 2.0 * m.z * (q3 * q4 - q1 * q2);
        let h_z = 2.0 * m.x * (q2 * q4 - q1 * q3)
            + 2.0 * m.y * (q3 * q4 + q1 * q2)
            + 2.0 * m.z * (0.5 - q2 * q2 - q3 * q3);

        // Project the flux onto the x and z axes only.
        self.b_x = libm::sqrt(h_x * h_x + h_y * h_y);
        self.b_z = h_z;
    }

    fn normalize_seq(&mut self) {
        let [q1, q2, q3, q4] = self.seq;
        let norm = libm::sqrt(q1 * q1 + q2 * q2 + q3 * q3 + q4 * q4);
        self.seq = [q1 / norm, q2 / norm, q3 / norm, q4 / norm];
    }
}

/// Scale a vector to unit length, or `None` for a zero-norm vector.
fn unit(v: Vector3<f64>) -> Option<Vector3<f64>> {
    let norm = v.norm();
    if norm == 0.0 {
        return None;
    }
    Some(v / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::ahrs::sampling::STANDARD_GRAVITY;

    const HALF_DEG: f64 = 0.5 * core::f64::consts::PI / 180.0;

    fn level_accel() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, STANDARD_GRAVITY)
    }

    fn mag_plus_x() -> Vector3<f64> {
        Vector3::new(1.0, 0.0, 0.0)
    }

    fn quaternion_norm(filter: &MargFilter) -> f64 {
        filter.quaternion().norm()
    }

    #[test]
    fn quaternion_stays_unit_norm_through_varied_updates() {
        let mut filter = MargFilter::new(MargConfig {
            gyro_meas_drift_dps: 0.5,
            ..MargConfig::default()
        });

        let inputs = [
            (Vector3::new(0.1, -0.2, 0.05), level_accel(), mag_plus_x()),
            (
                Vector3::new(-0.4, 0.3, 0.2),
                Vector3::new(1.0, 2.0, 8.0),
                Vector3::new(0.3, -0.8, 0.2),
            ),
            (Vector3::zeros(), Vector3::zeros(), mag_plus_x()),
            (
                Vector3::new(0.05, 0.05, -0.1),
                level_accel(),
                Vector3::zeros(),
            ),
            (
                Vector3::new(2.0, -1.5, 0.7),
                Vector3::new(-3.0, 0.5, 9.0),
                Vector3::new(0.9, 0.1, -0.4),
            ),
        ];

        for _ in 0..20 {
            for &(gyro, accel, mag) in inputs.iter() {
                filter.update(gyro, accel, mag);

                let norm = quaternion_norm(&filter);
                assert!((norm - 1.0).abs() < 1e-6, "norm drifted to {norm}");
                let q = filter.quaternion();
                assert!(q.w.is_finite() && q.i.is_finite() && q.j.is_finite() && q.k.is_finite());
            }
        }
    }

    #[test]
    fn reset_without_updates_reports_zero_euler() {
        let mut filter = MargFilter::new(MargConfig::default());
        filter.reset();

        let euler = filter.euler_angles();
        assert_eq!(euler, EulerAngles::ZERO);
        assert!(!filter.is_initialized());
    }

    #[test]
    fn reset_is_idempotent_and_clears_tracking_state() {
        let mut filter = MargFilter::new(MargConfig {
            gyro_meas_drift_dps: 1.0,
            ..MargConfig::default()
        });

        for _ in 0..10 {
            filter.update(
                Vector3::new(0.3, 0.1, -0.2),
                level_accel(),
                Vector3::new(0.8, 0.1, 0.3),
            );
        }
        assert!(filter.is_initialized());

        filter.reset();
        filter.reset();

        assert!(!filter.is_initialized());
        assert_eq!(filter.gyro_bias(), Vector3::zeros());
        assert_eq!(filter.euler_angles(), EulerAngles::ZERO);
        assert_eq!(filter.quaternion(), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn first_update_captures_auxiliary_frame() {
        let mut filter = MargFilter::new(MargConfig::default());
        assert_eq!(filter.auxiliary_frame(), Quaternion::new(1.0, 0.0, 0.0, 0.0));

        filter.update(Vector3::zeros(), level_accel(), mag_plus_x());
        assert!(filter.is_initialized());
        assert_eq!(filter.auxiliary_frame(), filter.quaternion());

        // Further updates leave the auxiliary frame untouched.
        let captured = filter.auxiliary_frame();
        for _ in 0..5 {
            filter.update(Vector3::new(0.2, 0.0, 0.0), level_accel(), mag_plus_x());
        }
        assert_eq!(filter.auxiliary_frame(), captured);
    }

    #[test]
    fn level_stationary_input_keeps_roll_pitch_near_zero() {
        let mut filter = MargFilter::new(MargConfig::default());

        for _ in 0..50 {
            filter.update(Vector3::zeros(), level_accel(), mag_plus_x());
        }

        let euler = filter.euler_angles();
        assert!(euler.roll.abs() < HALF_DEG, "roll = {}", euler.roll);
        assert!(euler.pitch.abs() < HALF_DEG, "pitch = {}", euler.pitch);
    }

    #[test]
    fn recovers_level_after_gyro_perturbation() {
        let mut filter = MargFilter::new(MargConfig::default());

        // Anchor the auxiliary frame at level.
        for _ in 0..5 {
            filter.update(Vector3::zeros(), level_accel(), mag_plus_x());
        }

        // Push the estimate off level with pure gyro integration (zero
        // accel/mag skips the correction): 0.03 rad/s for 0.5 s.
        for _ in 0..5 {
            filter.update(
                Vector3::new(0.03, 0.0, 0.0),
                Vector3::zeros(),
                Vector3::zeros(),
            );
        }
        let perturbed = filter.euler_angles();
        assert!(perturbed.roll.abs() > 0.01, "perturbation too small");

        // Level readings pull roll and pitch back within 50 cycles.
        for _ in 0..50 {
            filter.update(Vector3::zeros(), level_accel(), mag_plus_x());
        }

        let euler = filter.euler_angles();
        assert!(euler.roll.abs() < HALF_DEG, "roll = {}", euler.roll);
        assert!(euler.pitch.abs() < HALF_DEG, "pitch = {}", euler.pitch);
    }

    #[test]
    fn zero_vector_inputs_never_corrupt_the_estimate() {
        let mut filter = MargFilter::new(MargConfig::default());

        filter.update(Vector3::zeros(), level_accel(), mag_plus_x());
        let before = filter.quaternion();

        // Free fall, dead magnetometer, both at once.
        filter.update(Vector3::zeros(), Vector3::zeros(), mag_plus_x());
        filter.update(Vector3::zeros(), level_accel(), Vector3::zeros());
        filter.update(Vector3::zeros(), Vector3::zeros(), Vector3::zeros());

        let after = filter.quaternion();
        assert!((after.norm() - 1.0).abs() < 1e-6);
        assert!(after.w.is_finite());
        // With zero gyro rates the degenerate cycles are pure no-ops.
        assert!((after.w - before.w).abs() < 1e-12);
        assert!((after.i - before.i).abs() < 1e-12);
    }

    #[test]
    fn euler_is_relative_to_first_update_pose() {
        let mut filter = MargFilter::new(MargConfig::default());

        // First update anchors the auxiliary frame.
        filter.update(Vector3::zeros(), level_accel(), mag_plus_x());

        // Rotate away and back under pure gyro integration.
        let rate = Vector3::new(0.3, 0.0, 0.0);
        for _ in 0..10 {
            filter.update(rate, Vector3::zeros(), Vector3::zeros());
        }
        let away = filter.euler_angles();
        assert!(away.roll.abs() > 0.2, "rotation did not register");

        for _ in 0..10 {
            filter.update(-rate, Vector3::zeros(), Vector3::zeros());
        }

        let back = filter.euler_angles();
        assert!(back.roll.abs() < 0.01, "roll = {}", back.roll);
        assert!(back.pitch.abs() < 0.01, "pitch = {}", back.pitch);
        assert!(back.yaw.abs() < 0.01, "yaw = {}", back.yaw);
    }

    #[test]
    fn drift_tracking_accumulates_gyro_bias() {
        let mut filter = MargFilter::new(MargConfig {
            gyro_meas_drift_dps: 1.0,
            ..MargConfig::default()
        });

        // A constant rate the accelerometer/magnetometer contradict reads
        // as drift; the bias estimate must move toward it.
        let biased_rate = Vector3::new(0.05, 0.0, 0.0);
        for _ in 0..100 {
            filter.update(biased_rate, level_accel(), mag_plus_x());
        }

        assert!(
            filter.gyro_bias().x > 1e-3,
            "bias estimate stayed at {}",
            filter.gyro_bias().x
        );
        assert!((quaternion_norm(&filter) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_drift_config_never_touches_bias() {
        let mut filter = MargFilter::new(MargConfig::default());

        for _ in 0..50 {
            filter.update(Vector3::new(0.1, -0.05, 0.02), level_accel(), mag_plus_x());
        }

        assert_eq!(filter.gyro_bias(), Vector3::zeros());
    }

    #[test]
    fn euler_degree_conversions() {
        let euler = EulerAngles {
            roll: core::f64::consts::FRAC_PI_2,
            pitch: core::f64::consts::PI,
            yaw: -core::f64::consts::FRAC_PI_4,
        };

        assert!((euler.roll_deg() - 90.0).abs() < 1e-9);
        assert!((euler.pitch_deg() - 180.0).abs() < 1e-9);
        assert!((euler.yaw_deg() + 45.0).abs() < 1e-9);
    }
}
