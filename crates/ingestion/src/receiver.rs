//! Transport receiver task
//!
//! Runs the receive loop on its own tokio task: read one datagram, decode it,
//! enqueue the sample. Shutdown is cooperative; the pending receive is raced
//! against a watch signal and dropped, then the task is awaited.

use std::sync::Arc;

use contracts::{ContractError, DatagramSource, WireFormat};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::IngestionMetrics;
use crate::queue::SampleSender;
use crate::wire::decode_datagram;

/// Receive loop settings
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub format: WireFormat,
    pub max_datagram_bytes: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::Json,
            max_datagram_bytes: 65507,
        }
    }
}

impl From<&contracts::NetworkConfig> for ReceiverConfig {
    fn from(net: &contracts::NetworkConfig) -> Self {
        Self {
            format: net.format,
            max_datagram_bytes: net.max_datagram_bytes,
        }
    }
}

/// Handle to a running receive task
pub struct PoseReceiver {
    name: String,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    metrics: Arc<IngestionMetrics>,
}

impl PoseReceiver {
    /// Spawn the receive loop over `source`
    pub fn spawn<S: DatagramSource + 'static>(
        source: S,
        config: ReceiverConfig,
        sender: SampleSender,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        let name = source.name().to_string();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task_metrics = Arc::clone(&metrics);
        let task = tokio::spawn(async move {
            receive_loop(source, config, sender, task_metrics, shutdown_rx).await;
        });

        info!(source = %name, "pose receiver started");
        Self {
            name,
            shutdown_tx,
            task,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop, interrupt the pending receive, and wait for the task
    #[instrument(name = "pose_receiver_shutdown", skip(self), fields(source = %self.name))]
    pub async fn shutdown(self) -> Result<(), ContractError> {
        // Receiver side may already be gone if the task ended on its own.
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| ContractError::transport_receive(&self.name, e.to_string()))?;
        info!(source = %self.name, "pose receiver stopped");
        Ok(())
    }
}

#[instrument(
    name = "pose_receive_loop",
    skip(source, config, sender, metrics, shutdown_rx),
    fields(source = %source.name())
)]
async fn receive_loop<S: DatagramSource>(
    mut source: S,
    config: ReceiverConfig,
    sender: SampleSender,
    metrics: Arc<IngestionMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; config.max_datagram_bytes.max(1)];
    debug!(format = ?config.format, "receive loop running");

    loop {
        let received = tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            result = source.recv_datagram(&mut buf) => result,
        };

        let len = match received {
            Ok(len) => len,
            Err(e) => {
                metrics.record_transport_error();
                error!(error = %e, "datagram receive failed, continuing");
                continue;
            }
        };

        metrics.record_datagram();
        ::metrics::counter!("pose_relay_datagrams_received_total").increment(1);

        match decode_datagram(&buf[..len], config.format) {
            Ok(sample) => {
                sender.enqueue(sample);
            }
            Err(e) => {
                metrics.record_decode_error();
                ::metrics::counter!("pose_relay_samples_dropped_total", "reason" => e.kind())
                    .increment(1);
                warn!(error = %e, bytes = len, "dropping malformed datagram");
            }
        }
    }

    debug!("receive loop exited");
}
