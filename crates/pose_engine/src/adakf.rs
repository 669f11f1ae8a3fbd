//! Adaptive Kalman filter for the sender→local clock offset.
//!
//! Two states (offset, drift) with an EWMA-adapted measurement noise. Used by
//! the clock synchronizer when `clock.refinement = "kalman"`.

use std::collections::VecDeque;

use contracts::ClockConfig;
use nalgebra::{Matrix2, Vector2};

const MIN_DT: f64 = 1e-3;
const NOISE_EWMA_ALPHA: f64 = 0.85;
const DEFAULT_INTERVAL_S: f64 = 1.0 / 60.0;

/// Offset/drift estimator
///
/// x = [offset, drift], F = [[1, dt], [0, 1]], H = [1, 0]
#[derive(Debug, Clone)]
pub struct AdaKF {
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    q_offset: f64,
    q_drift: f64,
    base_r: f64,
    r: f64,
    ewma_variance: f64,
    residuals: VecDeque<f64>,
    residual_window: usize,
}

impl AdaKF {
    pub fn new(initial_offset: f64, config: &ClockConfig) -> Self {
        let base_r = config.measurement_noise.max(1e-12);
        let residual_window = config.residual_window.max(3);
        Self {
            state: Vector2::new(initial_offset, 0.0),
            covariance: Matrix2::identity() * base_r,
            q_offset: config.process_noise.max(1e-12),
            q_drift: (config.process_noise * 0.1).max(1e-12),
            base_r,
            r: base_r,
            ewma_variance: base_r,
            residuals: VecDeque::with_capacity(residual_window),
            residual_window,
        }
    }

    /// Feed one observation of `local_now - source_time`.
    ///
    /// Returns `(offset, residual)`.
    pub fn update(&mut self, observation: f64, dt: f64) -> (f64, f64) {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            DEFAULT_INTERVAL_S
        }
        .max(MIN_DT);

        let f = Matrix2::new(1.0, dt, 0.0, 1.0);
        let q = Matrix2::new(self.q_offset, 0.0, 0.0, self.q_drift);

        let predicted = f * self.state;
        let p = f * self.covariance * f.transpose() + q;

        let residual = observation - predicted[0];
        let s = p[(0, 0)] + self.r;
        let gain = Vector2::new(p[(0, 0)] / s, p[(1, 0)] / s);

        self.state = predicted + gain * residual;
        let mut updated = p - gain * p.row(0);
        updated[(0, 0)] = updated[(0, 0)].max(0.0);
        updated[(1, 1)] = updated[(1, 1)].max(0.0);
        self.covariance = updated;

        self.residuals.push_back(residual);
        if self.residuals.len() > self.residual_window {
            self.residuals.pop_front();
        }
        self.ewma_variance =
            NOISE_EWMA_ALPHA * self.ewma_variance + (1.0 - NOISE_EWMA_ALPHA) * residual.powi(2);
        self.r = self
            .ewma_variance
            .clamp(self.base_r * 0.1, self.base_r * 10.0);

        (self.state[0], residual)
    }

    pub fn offset(&self) -> f64 {
        self.state[0]
    }

    /// Seconds of offset change per second
    pub fn drift(&self) -> f64 {
        self.state[1]
    }

    /// Mean absolute residual over the recent window
    pub fn mean_abs_residual(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        self.residuals.iter().map(|r| r.abs()).sum::<f64>() / self.residuals.len() as f64
    }
}
