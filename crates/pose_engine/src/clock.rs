//! Clock synchronizer.
//!
//! Maps sender time into the local render clock (`local = sender + offset`)
//! and tracks one-way delay and jitter as EMAs. The offset is seeded once two
//! samples are buffered and then either held or refined by [`AdaKF`].
//!
//! One-way transit is not observable from timestamps alone. The fastest
//! delivery seen so far (`baseline = min(now - source)`) stands for the
//! configured nominal transit; delay is that transit plus the excess over the
//! baseline, and capture times are placed `transit` before the baseline arrival.

use contracts::{ClockConfig, OffsetRefinement, WindowConfig};
use tracing::{debug, instrument, trace};

use crate::adakf::AdaKF;
use crate::window::compute_window_ms;

#[derive(Debug, Clone)]
pub struct ClockSynchronizer {
    config: ClockConfig,
    offset: Option<f64>,
    delay_ema_ms: Option<f64>,
    jitter_ema_ms: f64,
    kalman: Option<AdaKF>,
    last_observed_at: Option<f64>,
    baseline_s: Option<f64>,
}

impl ClockSynchronizer {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            config: config.clone(),
            offset: None,
            delay_ema_ms: None,
            jitter_ema_ms: 0.0,
            kalman: None,
            last_observed_at: None,
            baseline_s: None,
        }
    }

    /// Track the fastest delivery; call for every arriving sample
    pub fn note_arrival(&mut self, now: f64, source_time: f64) {
        let elapsed = now - source_time;
        if self.baseline_s.is_none_or(|b| elapsed < b) {
            self.baseline_s = Some(elapsed);
            trace!(baseline_s = elapsed, "arrival baseline lowered");
        }
    }

    /// Seed the offset from the oldest buffered sample.
    ///
    /// No-op until at least two samples are buffered, and once seeded.
    /// Returns true when the offset was set by this call.
    pub fn try_initialize(&mut self, now: f64, oldest_source_time: f64, buffered: usize) -> bool {
        if self.offset.is_some() || buffered < 2 {
            return false;
        }
        let offset = now - oldest_source_time;
        self.offset = Some(offset);
        if self.config.refinement == OffsetRefinement::Kalman {
            self.kalman = Some(AdaKF::new(offset, &self.config));
        }
        debug!(offset_s = offset, "clock offset initialized");
        true
    }

    /// Update delay/jitter statistics with one accepted sample
    #[instrument(level = "trace", name = "clock_observe", skip(self))]
    pub fn observe(&mut self, now: f64, source_time: f64) {
        let Some(offset) = self.offset else {
            return;
        };

        self.note_arrival(now, source_time);
        let delay_ms = self.transit_delay_ms(now, source_time);
        match self.delay_ema_ms {
            None => self.delay_ema_ms = Some(delay_ms),
            Some(ema) => {
                let deviation = (delay_ms - ema).abs();
                self.jitter_ema_ms += self.config.jitter_alpha * (deviation - self.jitter_ema_ms);
                self.delay_ema_ms = Some(ema + self.config.delay_alpha * (delay_ms - ema));
            }
        }

        if let Some(kf) = self.kalman.as_mut() {
            let dt = self.last_observed_at.map_or(0.0, |last| now - last);
            let (refined, residual) = kf.update(now - source_time, dt);
            self.offset = Some(refined);
            trace!(offset_s = refined, residual_s = residual, "offset refined");
        }
        self.last_observed_at = Some(now);
    }

    /// Nominal transit plus the excess over the fastest delivery (ms, >= 0)
    fn transit_delay_ms(&self, now: f64, source_time: f64) -> f64 {
        let excess_s = self
            .baseline_s
            .map_or(0.0, |b| (now - source_time - b).max(0.0));
        self.config.transit_estimate_ms.max(0.0) + excess_s * 1000.0
    }

    /// Local time at which `source_time` was captured
    ///
    /// Available once any arrival was noted. Unlike [`Self::to_local`], this
    /// removes the transit folded into the arrival-based clocks.
    pub fn capture_local_time(&self, source_time: f64) -> Option<f64> {
        self.baseline_s
            .map(|b| source_time + b - self.config.transit_estimate_ms.max(0.0) / 1000.0)
    }

    pub fn baseline_s(&self) -> Option<f64> {
        self.baseline_s
    }

    pub fn offset(&self) -> Option<f64> {
        self.offset
    }

    pub fn is_synchronized(&self) -> bool {
        self.offset.is_some()
    }

    pub fn delay_ema_ms(&self) -> Option<f64> {
        self.delay_ema_ms
    }

    pub fn jitter_ema_ms(&self) -> Option<f64> {
        self.delay_ema_ms.map(|_| self.jitter_ema_ms)
    }

    /// Render-delay budget in milliseconds
    ///
    /// Adaptive window once delay statistics exist, otherwise the fixed budget.
    pub fn render_delay_ms(&self, fixed_ms: f64, window: &WindowConfig) -> f64 {
        match self.delay_ema_ms {
            Some(delay) if window.adaptive => compute_window_ms(delay, self.jitter_ema_ms, window),
            _ => fixed_ms,
        }
    }

    pub fn to_sender(&self, local_time: f64) -> Option<f64> {
        self.offset.map(|offset| local_time - offset)
    }

    pub fn to_local(&self, source_time: f64) -> Option<f64> {
        self.offset.map(|offset| source_time + offset)
    }

    pub fn reset(&mut self) {
        *self = Self::new(&self.config);
    }
}
