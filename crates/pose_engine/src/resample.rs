//! Temporal resampling strategies.
//!
//! Each [`ResamplingMode`] is one implementation of [`ResamplingStrategy`];
//! the engine holds the active one as a trait object and can swap it at runtime.
//! All strategies degrade to the most recent sample when history is short.

use contracts::{Pose, ResampleKind, ResamplingMode, UnitQuaternion};

use crate::history::{SampleEntry, SampleHistory};

/// Inputs for one resampling query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleContext {
    /// Local render time (seconds)
    pub now: f64,
    /// Render time minus the render delay, in the sender clock; `None` until synchronized
    pub sender_query: Option<f64>,
    pub render_delay_s: f64,
    pub lead_s: f64,
    pub min_delta_s: f64,
}

/// One resampled raw pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resampled {
    pub pose: Pose,
    /// Sender time the pose corresponds to
    pub sender_time: f64,
    pub kind: ResampleKind,
    pub confidence: Option<f64>,
}

impl Resampled {
    fn latest(entry: &SampleEntry) -> Self {
        Self {
            pose: entry.pose,
            sender_time: entry.time,
            kind: ResampleKind::Latest,
            confidence: entry.confidence,
        }
    }
}

/// "Given history and a query time, produce a pose"
pub trait ResamplingStrategy: Send {
    fn mode(&self) -> ResamplingMode;

    /// `None` only when the history is empty
    fn resample(&self, history: &SampleHistory, ctx: &ResampleContext) -> Option<Resampled>;
}

/// Strategy for a mode
pub fn strategy_for(mode: ResamplingMode) -> Box<dyn ResamplingStrategy> {
    match mode {
        ResamplingMode::None => Box::new(LatestSample),
        ResamplingMode::TimestampCompare => Box::new(TimestampCompare),
        ResamplingMode::BufferInterpolation => Box::new(BufferInterpolation),
        ResamplingMode::Hybrid => Box::new(Hybrid),
    }
}

/// Apply the newest sample as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestSample;

impl ResamplingStrategy for LatestSample {
    fn mode(&self) -> ResamplingMode {
        ResamplingMode::None
    }

    fn resample(&self, history: &SampleHistory, _ctx: &ResampleContext) -> Option<Resampled> {
        history.latest().map(Resampled::latest)
    }
}

/// Interpolate between the two newest samples, `render_delay` behind the newest.
///
/// Needs no clock offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCompare;

impl ResamplingStrategy for TimestampCompare {
    fn mode(&self) -> ResamplingMode {
        ResamplingMode::TimestampCompare
    }

    fn resample(&self, history: &SampleHistory, ctx: &ResampleContext) -> Option<Resampled> {
        let Some((a, b)) = history.last_two() else {
            return history.latest().map(Resampled::latest);
        };
        let target = b.time - ctx.render_delay_s;
        let t = interpolation_parameter(a.time, b.time, target);
        Some(interpolated(a, b, t))
    }
}

/// Interpolate the bracketing pair around the synchronized query time
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferInterpolation;

impl ResamplingStrategy for BufferInterpolation {
    fn mode(&self) -> ResamplingMode {
        ResamplingMode::BufferInterpolation
    }

    fn resample(&self, history: &SampleHistory, ctx: &ResampleContext) -> Option<Resampled> {
        match ctx.sender_query.and_then(|q| history.bracket(q).map(|pair| (q, pair))) {
            Some((query, (a, b))) => {
                let t = interpolation_parameter(a.time, b.time, query);
                Some(interpolated(a, b, t))
            }
            None => history.latest().map(Resampled::latest),
        }
    }
}

/// Bracket interpolation plus a short constant-velocity prediction
#[derive(Debug, Clone, Copy, Default)]
pub struct Hybrid;

impl ResamplingStrategy for Hybrid {
    fn mode(&self) -> ResamplingMode {
        ResamplingMode::Hybrid
    }

    fn resample(&self, history: &SampleHistory, ctx: &ResampleContext) -> Option<Resampled> {
        let Some((query, (a, b))) =
            ctx.sender_query.and_then(|q| history.bracket(q).map(|pair| (q, pair)))
        else {
            return history.latest().map(Resampled::latest);
        };

        let t = interpolation_parameter(a.time, b.time, query);
        let base = interpolated(a, b, t);
        let lead = ctx.lead_s.max(0.0);
        Some(Resampled {
            pose: predict(&a.pose, &b.pose, b.time - a.time, ctx.min_delta_s, &base.pose, lead),
            sender_time: base.sender_time + lead,
            kind: ResampleKind::Predicted,
            confidence: base.confidence,
        })
    }
}

/// `clamp01((query - ta) / (tb - ta))`, 1 when the span is degenerate
pub fn interpolation_parameter(ta: f64, tb: f64, query: f64) -> f64 {
    let span = tb - ta;
    if span <= f64::EPSILON {
        return 1.0;
    }
    ((query - ta) / span).clamp(0.0, 1.0)
}

fn interpolated(a: &SampleEntry, b: &SampleEntry, t: f64) -> Resampled {
    let confidence = match (a.confidence, b.confidence) {
        (Some(ca), Some(cb)) => Some(ca + (cb - ca) * t),
        (_, cb) => cb,
    };
    Resampled {
        pose: a.pose.interpolate(&b.pose, t),
        sender_time: a.time + (b.time - a.time) * t,
        kind: ResampleKind::Interpolated,
        confidence,
    }
}

/// Extrapolate `base` by `lead` seconds with the velocity from `a` to `b`
///
/// A degenerate rotation axis contributes no rotational prediction.
pub fn predict(a: &Pose, b: &Pose, span: f64, min_delta_s: f64, base: &Pose, lead: f64) -> Pose {
    let dt = span.max(min_delta_s).max(f64::EPSILON);
    let velocity = (b.position - a.position) / dt;

    let relative = b.orientation * a.orientation.inverse();
    let orientation = match relative.axis_angle() {
        Some((axis, angle)) => {
            let angular_velocity = angle / dt;
            UnitQuaternion::from_axis_angle(&axis, angular_velocity * lead) * base.orientation
        }
        None => base.orientation,
    };

    Pose::new(base.position + velocity * lead, orientation).renormalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Vector3;

    fn entry(time: f64, z: f64) -> SampleEntry {
        SampleEntry {
            time,
            sequence_id: (time * 1000.0) as u64,
            pose: Pose::from_position(Vector3::new(0.0, 0.0, z)),
            confidence: None,
        }
    }

    fn history(points: &[(f64, f64)]) -> SampleHistory {
        let mut history = SampleHistory::default();
        for &(t, z) in points {
            history.insert(entry(t, z));
        }
        history
    }

    fn ctx(sender_query: Option<f64>) -> ResampleContext {
        ResampleContext {
            now: 10.0,
            sender_query,
            render_delay_s: 0.03,
            lead_s: 0.018,
            min_delta_s: 0.005,
        }
    }

    #[test]
    fn test_all_modes_handle_empty_and_single() {
        let empty = SampleHistory::default();
        let single = history(&[(0.0, 0.4)]);
        for mode in ResamplingMode::ALL {
            let strategy = strategy_for(mode);
            assert_eq!(strategy.mode(), mode);
            assert!(strategy.resample(&empty, &ctx(Some(0.0))).is_none());

            let out = strategy.resample(&single, &ctx(Some(0.0))).unwrap();
            assert_eq!(out.kind, ResampleKind::Latest);
            assert_eq!(out.pose.position.z, 0.4);
        }
    }

    #[test]
    fn test_bracket_interpolation_scenario() {
        // z(t) = 20 * (t - 0.05): the 0.05 → 0.10 segment spans z 0 → 1
        let h = history(&[(0.0, -1.0), (0.05, 0.0), (0.1, 1.0)]);
        let out = BufferInterpolation.resample(&h, &ctx(Some(0.065))).unwrap();
        assert_eq!(out.kind, ResampleKind::Interpolated);
        assert!((out.pose.position.z - 0.3).abs() < 1e-9);
        assert!((out.sender_time - 0.065).abs() < 1e-12);
    }

    #[test]
    fn test_linear_ramp_parameter() {
        // 0 → 1 over 0.00..0.10 s, query 0.065 sits 30% into the last segment
        let h = history(&[(0.0, 0.0), (0.05, 0.5), (0.1, 1.0)]);
        let (a, b) = h.bracket(0.065).unwrap();
        assert_eq!((a.time, b.time), (0.05, 0.1));
        assert!((interpolation_parameter(a.time, b.time, 0.065) - 0.3).abs() < 1e-9);

        let out = BufferInterpolation.resample(&h, &ctx(Some(0.065))).unwrap();
        assert!((out.pose.position.z - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_interpolation_falls_back_to_latest() {
        let h = history(&[(0.0, 0.0), (0.05, 0.5), (0.1, 1.0)]);

        let before = BufferInterpolation.resample(&h, &ctx(Some(-1.0))).unwrap();
        assert_eq!(before.kind, ResampleKind::Latest);
        assert_eq!(before.pose.position.z, 1.0);

        let unsynced = BufferInterpolation.resample(&h, &ctx(None)).unwrap();
        assert_eq!(unsynced.kind, ResampleKind::Latest);
    }

    #[test]
    fn test_timestamp_compare_uses_two_newest() {
        let h = history(&[(0.0, 0.0), (0.05, 0.5), (0.1, 1.0)]);
        let out = TimestampCompare.resample(&h, &ctx(None)).unwrap();
        // target 0.07 between 0.05 and 0.10
        assert!((out.pose.position.z - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_timestamp_compare_equal_times() {
        let h = history(&[(0.1, 0.2), (0.1, 0.8)]);
        let out = TimestampCompare.resample(&h, &ctx(None)).unwrap();
        assert_eq!(out.pose.position.z, 0.8);
    }

    #[test]
    fn test_hybrid_predicts_ahead() {
        let h = history(&[(0.0, 0.0), (0.05, 0.5), (0.1, 1.0)]);
        let out = Hybrid.resample(&h, &ctx(Some(0.065))).unwrap();
        assert_eq!(out.kind, ResampleKind::Predicted);
        // 0.65 + 10 m/s * 0.018 s
        assert!((out.pose.position.z - 0.83).abs() < 1e-9);
        assert!((out.sender_time - 0.083).abs() < 1e-12);
    }

    #[test]
    fn test_predict_rotation() {
        let a = Pose::identity();
        let b = Pose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.1),
        );
        let out = predict(&a, &b, 0.05, 0.005, &b, 0.025);
        // 2 rad/s for 25 ms on top of 0.1 rad
        assert!((out.orientation.angle() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_predict_degenerate_axis() {
        let a = Pose::from_position(Vector3::new(0.0, 0.0, 0.0));
        let b = Pose::from_position(Vector3::new(0.0, 0.0, 0.0));
        let out = predict(&a, &b, 0.0, 0.005, &b, 0.018);
        assert!(out.is_finite());
        assert_eq!(out.orientation.angle(), 0.0);
    }

    #[test]
    fn test_interpolation_parameter() {
        assert_eq!(interpolation_parameter(0.0, 1.0, 0.25), 0.25);
        assert_eq!(interpolation_parameter(0.0, 1.0, 2.0), 1.0);
        assert_eq!(interpolation_parameter(0.0, 1.0, -2.0), 0.0);
        assert_eq!(interpolation_parameter(0.5, 0.5, 0.5), 1.0);
    }
}
