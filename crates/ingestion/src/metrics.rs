//! Receiver-side counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Ingestion metrics
///
/// Shared between the receive task and the queue; read by the consumer for
/// end-of-run summaries.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Datagrams read from the transport
    pub datagrams_received: AtomicU64,

    /// Samples pushed into the queue
    pub samples_enqueued: AtomicU64,

    /// Oldest samples evicted because the queue was full
    pub queue_overflows: AtomicU64,

    /// Datagrams that failed to decode
    pub decode_errors: AtomicU64,

    /// Socket errors other than shutdown
    pub transport_errors: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_datagram(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.samples_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.queue_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            samples_enqueued: self.samples_enqueued.load(Ordering::Relaxed),
            queue_overflows: self.queue_overflows.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub samples_enqueued: u64,
    pub queue_overflows: u64,
    pub decode_errors: u64,
    pub transport_errors: u64,
    pub queue_len: usize,
}
