#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::common::utils::format_speed;
use crate::model::proxy::ProxyConfig;

/// 延迟统计三元组。
///
/// `average` 为去极值平均（成功样本 ≥3 时掐头去尾各一个），
/// `jitter` 为全部成功样本围绕该均值的总体标准差，
/// `packet_loss` 为失败探测占总探测次数的百分比。
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    #[serde(rename = "latency", serialize_with = "ser_millis")]
    pub average: Duration,

    #[serde(serialize_with = "ser_millis")]
    pub jitter: Duration,

    pub packet_loss: f64,
}

/// 单个平台的解锁检测结论。
#[derive(Debug, Clone, Serialize)]
pub struct UnlockResult {
    pub platform: String,
    pub status: UnlockStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub info: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnlockStatus {
    Success,
    Failed,
}

impl UnlockResult {
    pub fn success(platform: &str, region: impl Into<String>) -> Self {
        Self {
            platform: platform.to_string(),
            status: UnlockStatus::Success,
            region: region.into(),
            info: String::new(),
        }
    }

    pub fn failed(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            status: UnlockStatus::Failed,
            region: String::new(),
            info: String::new(),
        }
    }

    pub fn failed_with(platform: &str, info: impl Into<String>) -> Self {
        Self {
            platform: platform.to_string(),
            status: UnlockStatus::Failed,
            region: String::new(),
            info: info.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UnlockStatus::Success
    }
}

/// 落地 IP 信息。查询失败时保持空结构而非 `None`，
/// 重命名与报表阶段据此判断有无数据。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpInfo {
    #[serde(default)]
    pub ip: String,

    #[serde(default)]
    pub country: String,

    /// 国旗 emoji。
    #[serde(rename = "flag", default)]
    pub country_flag: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub city: String,

    /// 风险评估文本，形如 `[12% 纯净]`，由欺诈评分页面解析得出。
    #[serde(default)]
    pub risk_info: String,
}

impl IpInfo {
    pub fn is_empty(&self) -> bool {
        self.ip.is_empty()
    }
}

/// 单个节点的完整测速结论，携带加载时刻的配置快照。
#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub name: String,

    #[serde(rename = "type")]
    pub proto: String,

    /// 加载阶段拍下的配置快照，重新导出链接时使用。
    pub config: ProxyConfig,

    #[serde(flatten)]
    pub latency: LatencyStats,

    pub download_size: f64,
    #[serde(serialize_with = "ser_millis")]
    pub download_time: Duration,
    pub download_speed: f64,

    pub upload_size: f64,
    #[serde(serialize_with = "ser_millis")]
    pub upload_time: Duration,
    pub upload_speed: f64,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub unlock_results: BTreeMap<String, UnlockResult>,

    pub ip_info: IpInfo,

    pub tested_at: NaiveDateTime,
}

impl BenchResult {
    pub fn new(name: impl Into<String>, config: ProxyConfig) -> Self {
        Self {
            name: name.into(),
            proto: config.kind().to_string(),
            config,
            latency: LatencyStats::default(),
            download_size: 0.0,
            download_time: Duration::ZERO,
            download_speed: 0.0,
            upload_size: 0.0,
            upload_time: Duration::ZERO,
            upload_speed: 0.0,
            unlock_results: BTreeMap::new(),
            ip_info: IpInfo::default(),
            tested_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn fmt_latency(&self) -> String {
        if self.latency.average.is_zero() {
            "N/A".to_string()
        } else {
            format!("{}ms", self.latency.average.as_millis())
        }
    }

    pub fn fmt_jitter(&self) -> String {
        if self.latency.jitter.is_zero() {
            "N/A".to_string()
        } else {
            format!("{}ms", self.latency.jitter.as_millis())
        }
    }

    pub fn fmt_packet_loss(&self) -> String {
        format!("{:.1}%", self.latency.packet_loss)
    }

    pub fn fmt_download_speed(&self) -> String {
        format_speed(self.download_speed)
    }

    pub fn fmt_upload_speed(&self) -> String {
        format_speed(self.upload_speed)
    }

    /// 解锁成功项摘要，如 `Netflix:US, YouTube:JP`。
    pub fn unlock_summary(&self) -> String {
        let mut parts = Vec::new();
        for r in self.unlock_results.values() {
            if !r.is_success() {
                continue;
            }
            if r.region.is_empty() {
                parts.push(r.platform.clone());
            } else {
                parts.push(format!("{}:{}", r.platform, r.region));
            }
        }
        parts.join(", ")
    }
}

fn ser_millis<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::proxy::TrojanConfig;

    fn sample() -> BenchResult {
        BenchResult::new(
            "测试节点",
            ProxyConfig::Trojan(TrojanConfig {
                server: "a.com".into(),
                port: 443,
                password: "p".into(),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn zero_latency_renders_na() {
        let r = sample();
        assert_eq!(r.fmt_latency(), "N/A");
        assert_eq!(r.fmt_jitter(), "N/A");
        assert_eq!(r.fmt_packet_loss(), "0.0%");
    }

    #[test]
    fn unlock_summary_lists_successes_only() {
        let mut r = sample();
        r.unlock_results
            .insert("youtube".into(), UnlockResult::success("YouTube", "JP"));
        r.unlock_results
            .insert("openai".into(), UnlockResult::failed("ChatGPT"));
        r.unlock_results
            .insert("steam".into(), UnlockResult::success("Steam", ""));
        assert_eq!(r.unlock_summary(), "Steam, YouTube:JP");
    }

    #[test]
    fn json_flattens_latency_in_millis() {
        let mut r = sample();
        r.latency.average = Duration::from_millis(230);
        r.latency.packet_loss = 5.0;
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["latency"], 230);
        assert_eq!(v["packet_loss"], 5.0);
        assert_eq!(v["type"], "trojan");
        assert_eq!(v["config"]["server"], "a.com");
    }
}
