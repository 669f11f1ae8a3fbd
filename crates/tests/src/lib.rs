//! # Integration Tests
//!
//! End-to-end tests across crate boundaries:
//! - config file → engine
//! - emitter → UDP → receiver → queue → engine → sink

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Pose, PoseSample, ResamplingMode, SmoothingMode};
    use pose_engine::PoseEngine;

    #[test]
    fn test_partial_toml_drives_engine() {
        let toml = r#"
            [resampling]
            mode = "none"

            [smoothing]
            mode = "linear"
            base_factor = 1.0

            [filter]
            deadzone_m = 0.0
            deadzone_deg = 0.0
        "#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.resampling.mode, ResamplingMode::None);
        assert_eq!(config.smoothing.mode, SmoothingMode::Linear);
        assert_eq!(config.queue.capacity, 40);

        let mut engine = PoseEngine::new(&config);
        let sample =
            PoseSample::from_components(0.0, 0, [0.0, 0.0, 0.2], [0.0, 0.0, 0.0, 1.0], None)
                .unwrap();
        let out = engine.tick(1.0, &Pose::identity(), vec![sample]);
        assert!((out.pose.unwrap().position.z - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_file_rejected_before_engine() {
        let err = ConfigLoader::load_from_str("[queue]\ncapacity = 0\n", ConfigFormat::Toml)
            .unwrap_err();
        assert!(err.to_string().contains("queue.capacity"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{
        HeadPoseSource, Pose, PoseSink, RelayConfig, ResamplingMode, UnitQuaternion, Vector3,
        WireFormat,
    };
    use ingestion::{
        sample_queue, EmitterConfig, IngestionMetrics, PoseEmitter, PoseReceiver, ReceiverConfig,
        Trajectory, UdpDatagramSource,
    };
    use pose_engine::PoseEngine;

    struct FixedHead(Pose);

    impl HeadPoseSource for FixedHead {
        fn current_head_pose(&mut self) -> Pose {
            self.0
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        poses: Vec<Pose>,
    }

    impl PoseSink for CollectingSink {
        fn name(&self) -> &str {
            "collect"
        }

        fn apply_pose(&mut self, pose: &Pose) {
            self.poses.push(*pose);
        }
    }

    async fn start_receiver(
        capacity: usize,
        format: WireFormat,
    ) -> (
        std::net::SocketAddr,
        PoseReceiver,
        ingestion::SampleReceiver,
        Arc<IngestionMetrics>,
    ) {
        let source = UdpDatagramSource::bind("127.0.0.1:0").await.unwrap();
        let addr = source.local_addr().unwrap();
        let metrics = Arc::new(IngestionMetrics::new());
        let (tx, rx) = sample_queue(capacity, metrics.clone());
        let config = ReceiverConfig {
            format,
            ..Default::default()
        };
        let receiver = PoseReceiver::spawn(source, config, tx, metrics.clone());
        (addr, receiver, rx, metrics)
    }

    /// Emitter → UDP → receiver → queue → engine → sink
    #[tokio::test]
    async fn test_e2e_udp_relay() {
        let (addr, receiver, queue, metrics) = start_receiver(40, WireFormat::Json).await;

        let emitter = PoseEmitter::start(EmitterConfig {
            target: addr,
            rate_hz: 200.0,
            trajectory: Trajectory::Linear {
                velocity: [0.0, 0.0, 0.5],
            },
            max_samples: Some(40),
            ..Default::default()
        })
        .await
        .unwrap();

        let mut config = RelayConfig::default();
        config.resampling.mode = ResamplingMode::BufferInterpolation;
        let mut engine = PoseEngine::new(&config);
        let mut head = FixedHead(Pose::identity());
        let mut sink = CollectingSink::default();

        let start = Instant::now();
        let mut ticker = tokio::time::interval(Duration::from_millis(11));
        while engine.stats().accepted < 40 && start.elapsed() < Duration::from_secs(5) {
            ticker.tick().await;
            engine.drive(start.elapsed().as_secs_f64(), &mut head, &queue, &mut sink);
        }

        assert_eq!(emitter.join().await, 40);
        receiver.shutdown().await.unwrap();

        assert_eq!(metrics.snapshot().decode_errors, 0);
        assert!(engine.stats().accepted >= 30, "accepted {}", engine.stats().accepted);
        assert!(engine.clock().is_synchronized());
        assert!(!sink.poses.is_empty());

        // Motion stays on the +z line and never runs past the newest sample
        let newest = engine.history().latest().unwrap().pose.position.z;
        for pose in &sink.poses {
            assert!(pose.position.z >= -1e-9 && pose.position.z <= newest + 1e-9);
            assert!(pose.position.x.abs() < 1e-9);
        }
    }

    /// Samples arrive as deltas and come out in the head's frame
    #[tokio::test]
    async fn test_e2e_reconstruction_against_head() {
        let (addr, receiver, queue, _metrics) = start_receiver(40, WireFormat::Bincode).await;

        let emitter = PoseEmitter::start(EmitterConfig {
            target: addr,
            rate_hz: 200.0,
            format: WireFormat::Bincode,
            trajectory: Trajectory::Static,
            max_samples: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
        emitter.join().await;

        let mut config = RelayConfig::default();
        config.resampling.mode = ResamplingMode::None;
        let mut engine = PoseEngine::new(&config);
        let head_pose = Pose::new(
            Vector3::new(1.0, 1.6, -2.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.5),
        );
        let mut head = FixedHead(head_pose);
        let mut sink = CollectingSink::default();

        let start = Instant::now();
        while sink.poses.is_empty() && start.elapsed() < Duration::from_secs(2) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.drive(start.elapsed().as_secs_f64(), &mut head, &queue, &mut sink);
        }
        receiver.shutdown().await.unwrap();

        // Zero delta reconstructs onto the reference itself
        let pose = sink.poses.last().unwrap();
        assert!(pose.distance_to(&head_pose) < 1e-9);
        assert!(pose.angle_to_deg(&head_pose) < 1e-4);
    }

    /// A stalled consumer sees only the newest `capacity` samples
    #[tokio::test]
    async fn test_e2e_queue_bounded_under_stall() {
        let (addr, receiver, queue, metrics) = start_receiver(8, WireFormat::Json).await;

        let emitter = PoseEmitter::start(EmitterConfig {
            target: addr,
            rate_hz: 500.0,
            trajectory: Trajectory::Static,
            max_samples: Some(30),
            ..Default::default()
        })
        .await
        .unwrap();
        emitter.join().await;

        let start = Instant::now();
        while metrics.snapshot().datagrams_received < 30 && start.elapsed() < Duration::from_secs(2)
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        receiver.shutdown().await.unwrap();

        let snapshot = metrics.snapshot();
        let drained = queue.dequeue_all();
        assert!(drained.len() <= 8);
        assert_eq!(
            snapshot.queue_overflows,
            snapshot.samples_enqueued - drained.len() as u64
        );
        if snapshot.datagrams_received == 30 {
            assert_eq!(drained.last().unwrap().sequence_id, 29);
        }
    }
}
