//! Head-pose history (render clock).

use contracts::{Pose, TimedPose};

use crate::history::TimedHistory;

const MIN_RETENTION_S: f64 = 0.2;

/// Recent reference-frame poses, for reconstructing a sample against the head
/// pose at the moment it was captured
#[derive(Debug)]
pub struct HeadHistory {
    entries: TimedHistory<TimedPose>,
    retention_s: f64,
    max_count: usize,
}

impl HeadHistory {
    pub fn new(retention_s: f64, max_count: usize) -> Self {
        Self {
            entries: TimedHistory::default(),
            retention_s: retention_s.max(MIN_RETENTION_S),
            max_count: max_count.max(2),
        }
    }

    pub fn record(&mut self, now: f64, pose: Pose) {
        self.entries.insert(TimedPose::new(now, pose));
        self.entries.prune_older_than(now - self.retention_s);
        self.entries.prune_to_max_count(self.max_count);
    }

    /// Head pose at local time `t`, interpolated and clamped to the recorded range
    pub fn pose_at(&self, t: f64) -> Option<Pose> {
        if let Some((a, b)) = self.entries.bracket(t) {
            let span = b.time - a.time;
            let alpha = if span > f64::EPSILON {
                ((t - a.time) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            return Some(a.pose.interpolate(&b.pose, alpha));
        }
        self.entries.find_closest(t).map(|entry| entry.pose)
    }

    pub fn latest(&self) -> Option<Pose> {
        self.entries.latest().map(|entry| entry.pose)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Vector3;

    fn head(x: f64) -> Pose {
        Pose::from_position(Vector3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_pose_at_interpolates() {
        let mut history = HeadHistory::new(1.0, 100);
        history.record(0.0, head(0.0));
        history.record(0.1, head(1.0));

        let mid = history.pose_at(0.025).unwrap();
        assert!((mid.position.x - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_pose_at_clamps() {
        let mut history = HeadHistory::new(1.0, 100);
        assert!(history.pose_at(0.0).is_none());

        history.record(1.0, head(1.0));
        assert_eq!(history.pose_at(0.0).unwrap().position.x, 1.0);

        history.record(2.0, head(2.0));
        assert_eq!(history.pose_at(-5.0).unwrap().position.x, 1.0);
        assert_eq!(history.pose_at(9.0).unwrap().position.x, 2.0);
    }

    #[test]
    fn test_retention_and_cap() {
        let mut history = HeadHistory::new(0.05, 4);
        for i in 0..20 {
            history.record(i as f64 * 0.01, head(i as f64));
        }
        // retention floors at 0.2 s, then the count cap applies
        assert_eq!(history.len(), 4);
        assert_eq!(history.latest().unwrap().position.x, 19.0);
    }
}
