//! Bounded drop-oldest sample queue
//!
//! The only structure shared between the receive task and the consumer tick.
//! One mutex guards the ring; it is held only for the push or the drain.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::PoseSample;
use ringbuf::{traits::*, HeapRb};
use tracing::trace;

use crate::metrics::IngestionMetrics;

type SharedRing = Arc<Mutex<HeapRb<PoseSample>>>;

/// Create a connected sender/receiver pair with the given capacity
pub fn sample_queue(
    capacity: usize,
    metrics: Arc<IngestionMetrics>,
) -> (SampleSender, SampleReceiver) {
    let capacity = capacity.max(1);
    let ring: SharedRing = Arc::new(Mutex::new(HeapRb::new(capacity)));
    (
        SampleSender {
            ring: ring.clone(),
            metrics: metrics.clone(),
        },
        SampleReceiver {
            ring,
            metrics,
            capacity,
        },
    )
}

fn lock(ring: &SharedRing) -> MutexGuard<'_, HeapRb<PoseSample>> {
    // A panic while holding the lock cannot leave the ring half-written.
    ring.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer half, owned by the receive task
pub struct SampleSender {
    ring: SharedRing,
    metrics: Arc<IngestionMetrics>,
}

impl SampleSender {
    /// Enqueue without blocking. Returns the evicted sample when full.
    pub fn enqueue(&self, sample: PoseSample) -> Option<PoseSample> {
        let (evicted, len) = {
            let mut ring = lock(&self.ring);
            let evicted = ring.push_overwrite(sample);
            (evicted, ring.occupied_len())
        };

        self.metrics.record_enqueued();
        self.metrics.update_queue_len(len);
        if let Some(old) = &evicted {
            self.metrics.record_overflow();
            ::metrics::counter!("pose_relay_queue_overflow_total").increment(1);
            trace!(sequence_id = old.sequence_id, "queue full, dropped oldest sample");
        }
        evicted
    }
}

/// Consumer half, owned by the tick
pub struct SampleReceiver {
    ring: SharedRing,
    metrics: Arc<IngestionMetrics>,
    capacity: usize,
}

impl SampleReceiver {
    /// Take everything queued, in arrival order
    pub fn dequeue_all(&self) -> Vec<PoseSample> {
        let drained: Vec<PoseSample> = {
            let mut ring = lock(&self.ring);
            ring.pop_iter().collect()
        };
        self.metrics.update_queue_len(0);
        drained
    }

    pub fn len(&self) -> usize {
        lock(&self.ring).occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u64) -> PoseSample {
        PoseSample::from_components(seq as f64 * 0.01, seq, [0.0; 3], [0.0, 0.0, 0.0, 1.0], None)
            .unwrap()
    }

    #[test]
    fn test_overflow_keeps_most_recent() {
        let metrics = Arc::new(IngestionMetrics::new());
        let (tx, rx) = sample_queue(8, metrics.clone());

        for seq in 0..13 {
            tx.enqueue(sample(seq));
        }

        let drained = rx.dequeue_all();
        let seqs: Vec<u64> = drained.iter().map(|s| s.sequence_id).collect();
        assert_eq!(seqs, (5..13).collect::<Vec<_>>());
        assert_eq!(metrics.snapshot().queue_overflows, 5);
    }

    #[test]
    fn test_dequeue_all_empties() {
        let (tx, rx) = sample_queue(4, Arc::new(IngestionMetrics::new()));
        tx.enqueue(sample(1));
        tx.enqueue(sample(2));
        assert_eq!(rx.len(), 2);

        assert_eq!(rx.dequeue_all().len(), 2);
        assert!(rx.is_empty());
        assert!(rx.dequeue_all().is_empty());
    }

    #[test]
    fn test_enqueue_reports_eviction() {
        let (tx, _rx) = sample_queue(1, Arc::new(IngestionMetrics::new()));
        assert!(tx.enqueue(sample(1)).is_none());
        let evicted = tx.enqueue(sample(2)).unwrap();
        assert_eq!(evicted.sequence_id, 1);
    }

    #[test]
    fn test_cross_thread_producer() {
        let (tx, rx) = sample_queue(40, Arc::new(IngestionMetrics::new()));
        let producer = std::thread::spawn(move || {
            for seq in 0..1000 {
                tx.enqueue(sample(seq));
            }
        });

        let mut last = None;
        let mut total = 0;
        while !producer.is_finished() || !rx.is_empty() {
            for s in rx.dequeue_all() {
                if let Some(prev) = last {
                    assert!(s.sequence_id > prev, "arrival order broken");
                }
                last = Some(s.sequence_id);
                total += 1;
            }
        }
        producer.join().unwrap();
        assert!(total <= 1000);
        assert_eq!(last, Some(999));
    }
}
