//! # 结果处理模块
//!
//! 测速结束后的三段式收尾：
//!
//! - 排序：按配置的字段序列逐级比较，余下的并列按名称升序；
//! - 筛选：延迟与丢包上限、速度下限、数量截断，只影响落盘内容；
//! - 重命名：按落地信息生成 `旗帜+中文国名+序号` 风格的标签。
//!
//! 三个操作都不触网，可独立测试。

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::common::countrymap;
use crate::error::AppError;
use crate::model::BenchResult;
use crate::model::app_config::FilterConfig;
use crate::service::stats::{self, ScorePolicy};

/// 可用的排序字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Latency,
    Jitter,
    PacketLoss,
    Download,
    Upload,
    Score,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latency" | "delay" => Ok(Self::Latency),
            "jitter" => Ok(Self::Jitter),
            "loss" | "packet_loss" | "packet-loss" => Ok(Self::PacketLoss),
            "download" | "speed" | "download_speed" => Ok(Self::Download),
            "upload" | "upload_speed" => Ok(Self::Upload),
            "score" => Ok(Self::Score),
            other => Err(AppError::ConfigError(format!("未知的排序字段: {other}"))),
        }
    }
}

/// 解析配置里的排序字段序列。
pub fn parse_sort_fields(names: &[String]) -> Result<Vec<SortField>, AppError> {
    names.iter().map(|n| n.parse()).collect()
}

/// 重命名模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenameMode {
    #[default]
    None,
    Add,
    Overwrite,
}

impl RenameMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "add" | "append" => Some(Self::Add),
            "overwrite" | "replace" => Some(Self::Overwrite),
            _ => None,
        }
    }
}

/// 按字段序列排序。无效值（零延迟、零抖动）始终排在末尾，
/// 吞吐字段降序，其余升序，完全并列时按名称升序。
pub fn sort_results(
    results: &mut [BenchResult],
    fields: &[SortField],
    policy: ScorePolicy,
    fast: bool,
) {
    let score_map: HashMap<String, f64> = if fields.contains(&SortField::Score) {
        let scores = stats::weighted_scores(results, fast, policy);
        results
            .iter()
            .map(|r| r.name.clone())
            .zip(scores)
            .collect()
    } else {
        HashMap::new()
    };

    results.sort_by(|a, b| {
        for field in fields {
            let ord = compare_field(a, b, *field, &score_map);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.name.cmp(&b.name)
    });
}

fn compare_field(
    a: &BenchResult,
    b: &BenchResult,
    field: SortField,
    scores: &HashMap<String, f64>,
) -> Ordering {
    match field {
        SortField::Latency => cmp_invalid_last(a.latency.average, b.latency.average),
        SortField::Jitter => cmp_invalid_last(a.latency.jitter, b.latency.jitter),
        SortField::PacketLoss => a.latency.packet_loss.total_cmp(&b.latency.packet_loss),
        SortField::Download => b.download_speed.total_cmp(&a.download_speed),
        SortField::Upload => b.upload_speed.total_cmp(&a.upload_speed),
        SortField::Score => {
            let sa = scores.get(&a.name).copied().unwrap_or(f64::MAX);
            let sb = scores.get(&b.name).copied().unwrap_or(f64::MAX);
            sa.total_cmp(&sb)
        }
    }
}

fn cmp_invalid_last(a: Duration, b: Duration) -> Ordering {
    match (a.is_zero(), b.is_zero()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(&b),
    }
}

/// 按阈值筛选，再按 `limit` 截断。丢包上限始终生效，
/// 速度下限在快速模式下跳过。
pub fn apply_filter(
    results: &[BenchResult],
    filter: &FilterConfig,
    fast: bool,
) -> Vec<BenchResult> {
    let mut kept: Vec<BenchResult> = results
        .iter()
        .filter(|r| passes(r, filter, fast))
        .cloned()
        .collect();

    if filter.limit > 0 && kept.len() > filter.limit {
        kept.truncate(filter.limit);
    }
    kept
}

fn passes(r: &BenchResult, filter: &FilterConfig, fast: bool) -> bool {
    if filter.max_latency_ms > 0 && r.latency.average.as_millis() as u64 > filter.max_latency_ms {
        return false;
    }
    if !fast {
        let mb = 1024.0 * 1024.0;
        if filter.min_download_mbps > 0.0 && r.download_speed / mb < filter.min_download_mbps {
            return false;
        }
        if filter.min_upload_mbps > 0.0 && r.upload_speed / mb < filter.min_upload_mbps {
            return false;
        }
    }
    if r.latency.packet_loss > filter.max_packet_loss {
        return false;
    }
    true
}

/// 按落地信息重命名。`add` 在原名后追加标签，`overwrite` 用标签替换原名；
/// 无落地信息时两种模式都保留原名。
pub fn apply_rename(results: &mut [BenchResult], mode: RenameMode) {
    if mode == RenameMode::None {
        return;
    }

    let mut counters: HashMap<String, u32> = HashMap::new();
    for r in results.iter_mut() {
        let Some(label) = enrichment_label(r, &mut counters) else {
            continue;
        };
        match mode {
            RenameMode::None => {}
            RenameMode::Add => r.name = format!("{} {}", r.name, label),
            RenameMode::Overwrite => r.name = label,
        }
    }
}

/// 生成形如 `🇯🇵日本01 [12% 纯净] ⬇️52.46MB/s [YouTube:JP]` 的标签。
/// 同一国家的节点依次编号。
fn enrichment_label(r: &BenchResult, counters: &mut HashMap<String, u32>) -> Option<String> {
    if r.ip_info.is_empty() {
        return None;
    }

    let country_cn = countrymap::chinese_name(&r.ip_info.country).to_string();
    let seq = counters.entry(country_cn.clone()).or_insert(0);
    *seq += 1;

    let flag = if r.ip_info.country_flag.is_empty() {
        countrymap::flag_emoji(&r.ip_info.country).unwrap_or_default()
    } else {
        r.ip_info.country_flag.clone()
    };

    let mut label = format!("{flag}{country_cn}{seq:02}");
    if !r.ip_info.risk_info.is_empty() {
        label.push(' ');
        label.push_str(&r.ip_info.risk_info);
    }
    if r.download_speed > 0.0 {
        label.push_str(" ⬇️");
        label.push_str(&r.fmt_download_speed());
    }
    let unlock = r.unlock_summary();
    if !unlock.is_empty() {
        label.push_str(&format!(" [{unlock}]"));
    }
    Some(label)
}
