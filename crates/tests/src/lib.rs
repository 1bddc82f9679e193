//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 合成录制 -> 标定引擎 -> 报告的 e2e 测试

#[cfg(test)]
mod contract_tests {
    use contracts::{CalibrationBlueprint, CalibrationError, TransformName};

    #[test]
    fn test_blueprint_toml_roundtrip() {
        let blueprint = CalibrationBlueprint::default();
        let toml = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(parsed, blueprint);
    }

    #[test]
    fn test_result_codes_are_stable() {
        assert_eq!(
            CalibrationError::NotYetComputed.code().as_str(),
            "not_yet_computed"
        );
        assert_eq!(
            CalibrationError::CorrelationResultEmpty.code().as_str(),
            "correlation_result_empty"
        );
    }

    #[test]
    fn test_transform_name_display_roundtrip() {
        let name: TransformName = "ProbeToReference".parse().unwrap();
        assert_eq!(name.to_string(), "ProbeToReference");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CalibrationError, ScalarSignal, SignConvention, SinkConfig, TemporalCalibrationConfig,
    };
    use observability::CalibrationStatsAggregator;
    use recording::{generate, Recording, RecordingStore, SyntheticRecordingConfig};
    use report::{create_sinks, publish, CalibrationReport, ReportStatus};
    use temporal_calibration::TemporalCalibration;

    const LAG_SEC: f64 = 0.12;
    const LAG_TOLERANCE_SEC: f64 = 0.02;

    fn synthetic(lag: f64) -> SyntheticRecordingConfig {
        SyntheticRecordingConfig {
            duration_sec: 6.0,
            image_width: 48,
            image_height: 96,
            line_depth_px: 48.0,
            amplitude_px: 16.0,
            tracker_lag_sec: lag,
            ..Default::default()
        }
    }

    fn config() -> TemporalCalibrationConfig {
        TemporalCalibrationConfig {
            sampling_resolution_sec: 0.005,
            max_tracker_lag_sec: 0.5,
            ..Default::default()
        }
    }

    fn engine_for(config: TemporalCalibrationConfig, recording: Recording) -> TemporalCalibration {
        let mut engine = TemporalCalibration::new(config);
        engine.set_video_frames(Arc::new(recording.video));
        engine.set_tracker_frames(Arc::new(recording.tracker));
        engine
    }

    /// Synthetic recording -> video / tracker extraction -> alignment
    ///
    /// 验证带噪声和无效帧的录制仍能恢复注入的延迟。
    #[test]
    fn test_e2e_synthetic_lag_recovery() {
        let recording = generate(&SyntheticRecordingConfig {
            pixel_noise: 6.0,
            position_noise_mm: 0.05,
            invalid_frame_period: Some(7),
            ..synthetic(LAG_SEC)
        })
        .unwrap();
        let frame_count = recording.video.len();

        let mut engine = engine_for(config(), recording);
        let result = engine.update().unwrap();

        assert!(
            (result.tracker_lag_sec - LAG_SEC).abs() <= LAG_TOLERANCE_SEC,
            "lag = {}",
            result.tracker_lag_sec
        );
        assert_eq!(result.selected_sign, SignConvention::Direct);

        let stats = result.video_stats.as_ref().unwrap();
        assert_eq!(stats.total_frames, frame_count);
        assert_eq!(stats.invalid_frames, frame_count / 7);
        assert!(stats.accepted_frames + stats.unusable_frames() <= frame_count);

        let axis = result.principal_axis.unwrap();
        assert!(axis[2] > 0.99, "axis = {axis:?}");
    }

    #[test]
    fn test_e2e_negative_lag() {
        let recording = generate(&synthetic(-0.2)).unwrap();
        let mut engine = engine_for(config(), recording);
        let lag = engine.update().unwrap().tracker_lag_sec;
        assert!((lag + 0.2).abs() <= LAG_TOLERANCE_SEC, "lag = {lag}");
    }

    /// 运动轴反向时跟踪器信号与视频反相，应选中取反的候选且延迟不变
    #[test]
    fn test_e2e_sign_invariance() {
        let recording = generate(&SyntheticRecordingConfig {
            motion_axis: [0.0, 0.0, -1.0],
            ..synthetic(LAG_SEC)
        })
        .unwrap();
        let mut engine = engine_for(config(), recording);
        let result = engine.update().unwrap();

        assert_eq!(result.selected_sign, SignConvention::Inverted);
        assert!((result.tracker_lag_sec - LAG_SEC).abs() <= LAG_TOLERANCE_SEC);
        assert!(result.candidates[1].score > result.candidates[0].score);
    }

    #[test]
    fn test_e2e_concrete_position_signals() {
        let values = [0.0, 1.0, 0.0, -1.0, 0.0];
        let mut engine = TemporalCalibration::default();
        engine.set_video_position_signal(
            ScalarSignal::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], values.to_vec()).unwrap(),
        );
        engine.set_tracker_position_signal(
            ScalarSignal::new(vec![0.05, 0.15, 0.25, 0.35, 0.45], values.to_vec()).unwrap(),
        );
        engine.set_sampling_resolution_sec(0.01);
        engine.set_maximum_video_tracker_lag_sec(0.2);

        let result = engine.update().unwrap();
        assert!((result.tracker_lag_sec - 0.05).abs() < 0.01);
        assert!(result.calibration_error < 0.1);
        assert_eq!(engine.correlation_signal().unwrap().signal.len(), 41);
    }

    #[test]
    fn test_e2e_insufficient_overlap() {
        let ramp = |t0: f64| {
            ScalarSignal::from_pairs((0..11).map(|i| (t0 + i as f64 * 0.1, i as f64))).unwrap()
        };
        let mut engine = TemporalCalibration::default();
        engine.set_video_position_signal(ramp(0.0));
        engine.set_tracker_position_signal(ramp(5.0));
        engine.set_maximum_video_tracker_lag_sec(0.1);

        let err = engine.update().unwrap_err();
        assert!(matches!(err, CalibrationError::InsufficientOverlap { .. }), "{err}");
        assert_eq!(engine.result().unwrap_err(), CalibrationError::NotYetComputed);
    }

    /// 探头静止：跟踪器位置没有变化，不能估计延迟
    #[test]
    fn test_e2e_degenerate_tracker_signal() {
        let mut recording = generate(&synthetic(0.0)).unwrap();
        let still = recording.tracker.frames[0].transforms.clone();
        for frame in &mut recording.tracker.frames {
            frame.transforms = still.clone();
        }

        let mut engine = engine_for(config(), recording);
        let err = engine.update().unwrap_err();
        assert!(
            matches!(
                err,
                CalibrationError::InsufficientSignalVariation { ref signal, .. }
                    if signal == "tracker_position"
            ),
            "{err}"
        );
    }

    #[test]
    fn test_e2e_update_is_idempotent() {
        let recording = generate(&SyntheticRecordingConfig {
            pixel_noise: 4.0,
            ..synthetic(LAG_SEC)
        })
        .unwrap();
        let mut engine = engine_for(config(), recording);
        let first = engine.update().unwrap().clone();
        let second = engine.update().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_e2e_recording_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");
        let recording = generate(&synthetic(LAG_SEC)).unwrap();
        RecordingStore::save(&path, &recording).unwrap();

        let loaded = RecordingStore::load(&path).unwrap();
        assert_eq!(loaded, recording);

        let from_disk = engine_for(config(), loaded).update().unwrap().clone();
        let in_memory = engine_for(config(), recording).update().unwrap().clone();
        assert_eq!(from_disk, in_memory);
    }

    /// Engine -> CalibrationReport -> FileSink
    #[test]
    fn test_e2e_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let recording = generate(&synthetic(LAG_SEC)).unwrap();
        let mut engine = engine_for(config(), recording);
        let result = engine.update().unwrap().clone();

        let mut sinks = create_sinks(&[
            SinkConfig::log("console"),
            SinkConfig::file("files", dir.path().to_string_lossy()),
        ])
        .unwrap();
        let report = CalibrationReport::new("synthetic", result.clone(), config());
        assert_eq!(report.status, ReportStatus::Ok);
        assert!(publish(&mut sinks, &report).is_empty());

        let json = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["source"], "synthetic");

        let csv = std::fs::read_to_string(dir.path().join("correlation.csv")).unwrap();
        assert_eq!(csv.lines().count(), result.signals.correlation.len() + 1);
        let csv = std::fs::read_to_string(dir.path().join("video_position.csv")).unwrap();
        assert_eq!(csv.lines().count(), result.signals.video_position.len() + 1);
    }

    #[test]
    fn test_e2e_config_drives_engine() {
        let toml = r#"
[calibration]
sampling_resolution_sec = 0.005
max_tracker_lag_sec = 0.5

[calibration.video]
number_of_scanlines = 20
peak_position_metric = "peak_start"

[calibration.alignment]
metric = "correlation"
normalization = "standard_deviation"
interpolation = "monotone_cubic"

[[sinks]]
name = "console"
sink_type = "log"
"#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let recording = generate(&synthetic(LAG_SEC)).unwrap();
        let mut engine = engine_for(blueprint.calibration, recording);
        let result = engine.update().unwrap();

        assert_eq!(result.metric.as_str(), "correlation");
        assert!((result.tracker_lag_sec - LAG_SEC).abs() <= LAG_TOLERANCE_SEC);
    }

    #[test]
    fn test_e2e_threshold_marks_report_suspect() {
        let mut config = config();
        config.alignment.thresholds.ssd = Some(1.0);
        let recording = generate(&synthetic(LAG_SEC)).unwrap();
        let mut engine = engine_for(config.clone(), recording);

        let err = engine.update().unwrap_err();
        assert!(matches!(err, CalibrationError::ResultAboveThreshold { .. }));
        let result = engine.result().unwrap().clone();
        assert!(result.above_threshold);

        let report = CalibrationReport::new("synthetic", result, config);
        assert_eq!(report.status, ReportStatus::Suspect);
    }

    #[test]
    fn test_e2e_trial_aggregation() {
        let mut aggregator = CalibrationStatsAggregator::new();
        for seed in 0..3 {
            let recording = generate(&SyntheticRecordingConfig {
                position_noise_mm: 0.05,
                seed,
                ..synthetic(LAG_SEC)
            })
            .unwrap();
            let mut engine = engine_for(config(), recording);
            match engine.update() {
                Ok(result) => aggregator.record_success(result, Some(LAG_SEC)),
                Err(e) => aggregator.record_failure(&e),
            }
        }
        aggregator.record_failure(&CalibrationError::NoVideoData);

        let summary = aggregator.summary();
        assert_eq!(summary.total_runs, 4);
        assert_eq!(summary.failed_runs, 1);
        assert_eq!(summary.lag_error_ms.count, 3);
        assert!(summary.lag_error_ms.max <= LAG_TOLERANCE_SEC * 1000.0);
        assert!(summary.to_string().contains("no_video_data: 1"));
    }
}
