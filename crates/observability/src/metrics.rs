//! 标定指标收集模块
//!
//! 引擎内部已经上报单次 `update()` 的计数与耗时，这里补充上层流程
//! (报告分发、仿真试验) 的指标，并提供多次运行的内存聚合。

use std::collections::BTreeMap;

use contracts::{CalibrationError, CalibrationResult};
use metrics::{counter, gauge, histogram};

/// 记录一次报告分发
pub fn record_report_published(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "tcal_reports_published_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次仿真试验的延迟估计误差
///
/// ```ignore
/// let result = engine.result().unwrap();
/// observability::metrics::record_simulation_trial(0.12, result.tracker_lag_sec);
/// ```
pub fn record_simulation_trial(expected_lag_sec: f64, estimated_lag_sec: f64) {
    counter!("tcal_simulation_trials_total").increment(1);
    let error_ms = (estimated_lag_sec - expected_lag_sec) * 1000.0;
    gauge!("tcal_simulation_lag_error_ms").set(error_ms);
    histogram!("tcal_simulation_lag_error_ms_hist").record(error_ms.abs());
}

/// 标定结果聚合器
///
/// 在内存中聚合多次标定，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CalibrationStatsAggregator {
    /// 总运行次数
    pub total_runs: u64,

    /// 失败次数
    pub failed_runs: u64,

    /// 得分未通过阈值的次数
    pub suspect_runs: u64,

    /// 估计延迟 (ms)
    pub lag_stats: RunningStats,

    /// 与已知延迟的绝对误差 (ms)，仅在已知真值时记录
    pub lag_error_stats: RunningStats,

    /// RMS 标定误差
    pub calibration_error_stats: RunningStats,

    /// 最佳得分
    pub score_stats: RunningStats,

    /// 视频不可用帧比例 (%)
    pub unusable_frame_stats: RunningStats,

    /// 各失败码出现次数
    pub failure_counts: BTreeMap<&'static str, u64>,
}

impl CalibrationStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功的标定；`expected_lag_sec` 为已知真值 (仿真)
    pub fn record_success(&mut self, result: &CalibrationResult, expected_lag_sec: Option<f64>) {
        self.total_runs += 1;
        if result.above_threshold {
            self.suspect_runs += 1;
        }

        self.lag_stats.push(result.tracker_lag_sec * 1000.0);
        if let Some(expected) = expected_lag_sec {
            self.lag_error_stats
                .push((result.tracker_lag_sec - expected).abs() * 1000.0);
        }
        self.calibration_error_stats.push(result.calibration_error);
        self.score_stats.push(result.best_score);

        if let Some(stats) = &result.video_stats {
            self.unusable_frame_stats
                .push(stats.unusable_fraction() * 100.0);
        }
    }

    /// 记录一次失败的标定
    pub fn record_failure(&mut self, error: &CalibrationError) {
        self.total_runs += 1;
        self.failed_runs += 1;
        *self.failure_counts.entry(error.code().as_str()).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> CalibrationSummary {
        let successful_runs = self.total_runs - self.failed_runs;
        CalibrationSummary {
            total_runs: self.total_runs,
            failed_runs: self.failed_runs,
            suspect_runs: self.suspect_runs,
            failure_rate: percentage(self.failed_runs, self.total_runs),
            suspect_rate: percentage(self.suspect_runs, successful_runs),
            lag_ms: StatsSummary::from(&self.lag_stats),
            lag_error_ms: StatsSummary::from(&self.lag_error_stats),
            calibration_error: StatsSummary::from(&self.calibration_error_stats),
            best_score: StatsSummary::from(&self.score_stats),
            unusable_frames_pct: StatsSummary::from(&self.unusable_frame_stats),
            failure_counts: self.failure_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct CalibrationSummary {
    pub total_runs: u64,
    pub failed_runs: u64,
    pub suspect_runs: u64,
    pub failure_rate: f64,
    pub suspect_rate: f64,
    pub lag_ms: StatsSummary,
    pub lag_error_ms: StatsSummary,
    pub calibration_error: StatsSummary,
    pub best_score: StatsSummary,
    pub unusable_frames_pct: StatsSummary,
    pub failure_counts: BTreeMap<&'static str, u64>,
}

impl std::fmt::Display for CalibrationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Temporal Calibration Summary ===")?;
        writeln!(f, "Total runs: {}", self.total_runs)?;
        writeln!(
            f,
            "Failed runs: {} ({:.2}%)",
            self.failed_runs, self.failure_rate
        )?;
        writeln!(
            f,
            "Suspect results: {} ({:.2}%)",
            self.suspect_runs, self.suspect_rate
        )?;
        writeln!(f, "Tracker lag (ms): {}", self.lag_ms)?;
        writeln!(f, "Lag error (ms): {}", self.lag_error_ms)?;
        writeln!(f, "Calibration error: {}", self.calibration_error)?;
        writeln!(f, "Best score: {}", self.best_score)?;
        writeln!(f, "Unusable video frames (%): {}", self.unusable_frames_pct)?;

        if !self.failure_counts.is_empty() {
            writeln!(f, "Failures:")?;
            for (code, count) in &self.failure_counts {
                writeln!(f, "  {}: {}", code, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值，非有限值被忽略
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差 (n - 1)
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
