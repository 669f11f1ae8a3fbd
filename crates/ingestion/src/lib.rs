//! # Ingestion
//!
//! Transport side of the pose relay.
//!
//! Responsibilities:
//! - Receive datagrams on a background task (`PoseReceiver`)
//! - Decode JSON / bincode wire records into validated `PoseSample`s
//! - Hand samples to the consumer through a bounded drop-oldest queue
//! - Emit synthetic samples for demos and end-to-end tests
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ingestion::{sample_queue, IngestionMetrics, PoseReceiver, ReceiverConfig, UdpDatagramSource};
//!
//! let metrics = Arc::new(IngestionMetrics::new());
//! let (tx, rx) = sample_queue(40, metrics.clone());
//! let source = UdpDatagramSource::bind("0.0.0.0:12345").await?;
//! let receiver = PoseReceiver::spawn(source, ReceiverConfig::default(), tx, metrics);
//!
//! // once per render tick
//! for sample in rx.dequeue_all() { /* ... */ }
//!
//! receiver.shutdown().await?;
//! ```

mod emitter;
mod error;
mod metrics;
mod queue;
mod receiver;
mod udp;
mod wire;

pub use emitter::{EmitterConfig, PoseEmitter, Trajectory};
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use queue::{sample_queue, SampleReceiver, SampleSender};
pub use receiver::{PoseReceiver, ReceiverConfig};
pub use udp::UdpDatagramSource;
pub use wire::{decode_datagram, encode_sample, BinaryPoseRecord, WireRecord, WireTimestamp};
