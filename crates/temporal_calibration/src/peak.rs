//! 扫描线强度峰检测
//!
//! 在一条竖直扫描线的强度剖面上寻找面积最大的高亮区段，并将其归约为一个行坐标。

use contracts::PeakPositionMetric;

/// 剖面上的一个连续高亮区段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// 区段起始行 (包含)
    pub start: usize,
    /// 区段结束行 (不包含)
    pub end: usize,
    /// 区段内最大强度
    pub max_value: u8,
    /// 最大强度所在行
    pub max_index: usize,
    /// 区段强度和
    pub area: u64,
}

/// 寻找面积最大的区段
///
/// 阈值为 `max(profile) * threshold_fraction`，严格大于阈值的连续样本构成一个区段。
/// 面积相同时保留先出现的区段；延伸到剖面末尾的区段同样参与比较。
pub fn find_largest_peak(profile: &[u8], threshold_fraction: f64) -> Option<Peak> {
    let profile_max = *profile.iter().max()?;
    let threshold = f64::from(profile_max) * threshold_fraction;

    let mut best: Option<Peak> = None;
    let mut current: Option<Peak> = None;

    for (index, &value) in profile.iter().enumerate() {
        if f64::from(value) > threshold {
            let run = current.get_or_insert(Peak {
                start: index,
                end: index,
                max_value: value,
                max_index: index,
                area: 0,
            });
            run.end = index + 1;
            run.area += u64::from(value);
            if value > run.max_value {
                run.max_value = value;
                run.max_index = index;
            }
        } else if let Some(run) = current.take() {
            keep_larger(&mut best, run);
        }
    }
    if let Some(run) = current.take() {
        keep_larger(&mut best, run);
    }

    best.filter(|peak| peak.area > 0)
}

fn keep_larger(best: &mut Option<Peak>, candidate: Peak) {
    match best {
        Some(b) if b.area >= candidate.area => {}
        _ => *best = Some(candidate),
    }
}

/// 将一个区段归约为行坐标
pub trait PeakLocator {
    fn locate(&self, profile: &[u8], peak: &Peak) -> Option<f64>;
}

impl PeakLocator for PeakPositionMetric {
    fn locate(&self, profile: &[u8], peak: &Peak) -> Option<f64> {
        match self {
            PeakPositionMetric::CenterOfGravity => center_of_gravity(profile, peak),
            PeakPositionMetric::PeakStart => peak_start(profile, peak),
        }
    }
}

/// 区段内强度加权平均行号
pub fn center_of_gravity(profile: &[u8], peak: &Peak) -> Option<f64> {
    let run = profile.get(peak.start..peak.end)?;
    let (weighted, total) = run
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(weighted, total), (offset, &value)| {
            let value = f64::from(value);
            (weighted + (peak.start + offset) as f64 * value, total + value)
        });
    (total > 0.0).then(|| weighted / total)
}

/// 区段内第一个超过峰值一半的行
pub fn peak_start(profile: &[u8], peak: &Peak) -> Option<f64> {
    let half = f64::from(peak.max_value) * 0.5;
    profile
        .get(peak.start..peak.end)?
        .iter()
        .position(|&value| f64::from(value) > half)
        .map(|offset| (peak.start + offset) as f64)
}
