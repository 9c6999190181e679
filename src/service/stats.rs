//! # 延迟统计与加权评分模块
//!
//! ## 核心功能
//! - **延迟统计**：对成功探测样本做去极值平均，计算抖动与丢包率
//! - **加权评分**：把多维指标折算成单一排序分数，支持两种策略
//!
//! ## 评分策略
//! - `rank`：按指标名次加权求和，对离群值不敏感
//! - `normalized`:按结果集内最值归一化后加权求和，保留差距大小

use std::time::Duration;

use crate::model::result::{BenchResult, LatencyStats};

/// 快速模式权重：延迟 0.60 / 抖动 0.20 / 丢包 0.20。
pub const FAST_WEIGHTS: ScoreWeights =
    ScoreWeights { latency: 0.60, jitter: 0.20, packet_loss: 0.20, download: 0.0, upload: 0.0 };

/// 完整模式权重：延迟 0.35 / 抖动 0.15 / 丢包 0.15 / 下载 0.30 / 上传 0.05。
pub const FULL_WEIGHTS: ScoreWeights =
    ScoreWeights { latency: 0.35, jitter: 0.15, packet_loss: 0.15, download: 0.30, upload: 0.05 };

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub latency: f64,
    pub jitter: f64,
    pub packet_loss: f64,
    pub download: f64,
    pub upload: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    #[default]
    RankBased,
    Normalized,
}

impl ScorePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rank" | "rank-based" | "rankbased" => Some(ScorePolicy::RankBased),
            "normalized" | "norm" => Some(ScorePolicy::Normalized),
            _ => None,
        }
    }
}

/// 由成功样本与总探测次数计算延迟统计。
///
/// 成功样本 ≥3 时剔除单个最小值与最大值后取均值；
/// 抖动始终基于全部成功样本、围绕去极值均值计算，
/// 因此截断产生的不对称会反映在抖动里。
pub fn compute_latency_stats(samples: &[Duration], total_attempts: usize) -> LatencyStats {
    let failed = total_attempts.saturating_sub(samples.len());
    let packet_loss = if total_attempts == 0 {
        0.0
    } else {
        failed as f64 / total_attempts as f64 * 100.0
    };

    if samples.is_empty() {
        return LatencyStats { average: Duration::ZERO, jitter: Duration::ZERO, packet_loss };
    }

    let mut sorted = samples.to_vec();
    sorted.sort();
    let trimmed: &[Duration] =
        if sorted.len() > 2 { &sorted[1..sorted.len() - 1] } else { &sorted[..] };
    let avg_secs = trimmed.iter().map(Duration::as_secs_f64).sum::<f64>() / trimmed.len() as f64;

    let variance = sorted
        .iter()
        .map(|d| {
            let diff = d.as_secs_f64() - avg_secs;
            diff * diff
        })
        .sum::<f64>()
        / sorted.len() as f64;

    LatencyStats {
        average: Duration::from_secs_f64(avg_secs),
        jitter: Duration::from_secs_f64(variance.sqrt()),
        packet_loss,
    }
}

/// 计算整个结果集的加权分数，越小越好，与 `results` 下标一一对应。
pub fn weighted_scores(results: &[BenchResult], fast: bool, policy: ScorePolicy) -> Vec<f64> {
    let w = if fast { FAST_WEIGHTS } else { FULL_WEIGHTS };
    let latency: Vec<f64> = results.iter().map(|r| r.latency.average.as_secs_f64() * 1000.0).collect();
    let jitter: Vec<f64> = results.iter().map(|r| r.latency.jitter.as_secs_f64() * 1000.0).collect();
    let loss: Vec<f64> = results.iter().map(|r| r.latency.packet_loss).collect();
    let download: Vec<f64> = results.iter().map(|r| r.download_speed).collect();
    let upload: Vec<f64> = results.iter().map(|r| r.upload_speed).collect();

    match policy {
        ScorePolicy::Normalized => {
            let lat_s = rescale_lower_better(&latency, true);
            let jit_s = rescale_lower_better(&jitter, true);
            let loss_s = rescale_lower_better(&loss, false);
            let dl_s = rescale_higher_better(&download);
            let ul_s = rescale_higher_better(&upload);
            (0..results.len())
                .map(|i| {
                    -(w.latency * lat_s[i]
                        + w.jitter * jit_s[i]
                        + w.packet_loss * loss_s[i]
                        + w.download * dl_s[i]
                        + w.upload * ul_s[i])
                })
                .collect()
        }
        ScorePolicy::RankBased => {
            let lat_r = ranks_lower_better(&latency, true);
            let jit_r = ranks_lower_better(&jitter, true);
            let loss_r = ranks_lower_better(&loss, false);
            let dl_r = ranks_higher_better(&download);
            let ul_r = ranks_higher_better(&upload);
            (0..results.len())
                .map(|i| {
                    w.latency * lat_r[i]
                        + w.jitter * jit_r[i]
                        + w.packet_loss * loss_r[i]
                        + w.download * dl_r[i]
                        + w.upload * ul_r[i]
                })
                .collect()
        }
    }
}

/// 归一化到 [0,1]，1 为最优。`zero_invalid` 时 0 视为无效值，得 0 分。
fn rescale_lower_better(values: &[f64], zero_invalid: bool) -> Vec<f64> {
    let valid: Vec<f64> =
        values.iter().copied().filter(|v| !zero_invalid || *v > 0.0).collect();
    if valid.is_empty() {
        return vec![0.0; values.len()];
    }
    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|&v| {
            if zero_invalid && v == 0.0 {
                0.0
            } else if (max - min).abs() < f64::EPSILON {
                1.0
            } else {
                (max - v) / (max - min)
            }
        })
        .collect()
}

fn rescale_higher_better(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|&v| {
            if (max - min).abs() < f64::EPSILON { 1.0 } else { (v - min) / (max - min) }
        })
        .collect()
}

/// 同分制名次：1 + 严格更优的个数。无效值排在所有有效值之后。
fn ranks_lower_better(values: &[f64], zero_invalid: bool) -> Vec<f64> {
    let n = values.len();
    values
        .iter()
        .map(|&v| {
            if zero_invalid && v == 0.0 {
                (n + 1) as f64
            } else {
                let better = values
                    .iter()
                    .filter(|&&o| (!zero_invalid || o > 0.0) && o < v)
                    .count();
                (1 + better) as f64
            }
        })
        .collect()
}

fn ranks_higher_better(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            let better = values.iter().filter(|&&o| o > v).count();
            (1 + better) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::proxy::{ProxyConfig, TrojanConfig};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn result_with(latency_ms: u64, download: f64) -> BenchResult {
        let mut r = BenchResult::new(
            format!("n{latency_ms}-{download}"),
            ProxyConfig::Trojan(TrojanConfig {
                server: "a.com".into(),
                port: 443,
                password: "p".into(),
                ..Default::default()
            }),
        );
        r.latency.average = ms(latency_ms);
        r.download_speed = download;
        r
    }

    #[test]
    fn trimmed_mean_drops_single_min_and_max() {
        let samples = [ms(10), ms(20), ms(30), ms(40), ms(1000)];
        let stats = compute_latency_stats(&samples, 20);
        assert_eq!(stats.average.as_millis(), 30);
        assert_eq!(stats.packet_loss, 75.0);
    }

    #[test]
    fn jitter_uses_all_samples_around_trimmed_mean() {
        let samples = [ms(10), ms(20), ms(30), ms(40), ms(1000)];
        let stats = compute_latency_stats(&samples, 20);
        // 方差 = (400+100+0+100+940900)/5 ms²
        assert_eq!(stats.jitter.as_millis(), 433);
    }

    #[test]
    fn small_sample_uses_plain_mean() {
        let stats = compute_latency_stats(&[ms(100), ms(200)], 20);
        assert_eq!(stats.average.as_millis(), 150);
    }

    #[test]
    fn zero_successes_keeps_loss_only() {
        let stats = compute_latency_stats(&[], 20);
        assert!(stats.average.is_zero());
        assert!(stats.jitter.is_zero());
        assert_eq!(stats.packet_loss, 100.0);
    }

    #[test]
    fn rank_policy_orders_by_download_when_rest_is_equal() {
        let results =
            vec![result_with(100, 1.0), result_with(100, 10.0), result_with(100, 5.0)];
        let scores = weighted_scores(&results, false, ScorePolicy::RankBased);
        // 下载 10 > 5 > 1，分数越小越好
        assert!(scores[1] < scores[2]);
        assert!(scores[2] < scores[0]);
    }

    #[test]
    fn normalized_policy_zeroes_invalid_latency() {
        let results = vec![result_with(0, 0.0), result_with(100, 0.0)];
        let scores = weighted_scores(&results, true, ScorePolicy::Normalized);
        assert!(scores[1] < scores[0]);
    }

    #[test]
    fn equal_metrics_share_rank() {
        let results = vec![result_with(100, 5.0), result_with(100, 5.0)];
        let scores = weighted_scores(&results, false, ScorePolicy::RankBased);
        assert_eq!(scores[0], scores[1]);
    }
}
