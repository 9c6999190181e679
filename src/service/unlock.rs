//! # 流媒体解锁检测模块
//!
//! 通过代理客户端访问各平台的探测端点，判断该出口能否使用对应服务，
//! 并尽量带回地区或货币信息。
//!
//! 内置平台：
//!
//! - YouTube Premium（页面中的地区代码）
//! - ChatGPT（API 与 iOS 端点双重判定）
//! - Disney+（重定向与页面地区）
//! - Spotify（账号接口状态码）
//! - Steam（商店页货币）
//!
//! 探测表在启动时构建一次并按引用传递，平台选择大小写不敏感，
//! `all` 表示全部。

pub mod disney;
pub mod openai;
pub mod spotify;
pub mod steam;
pub mod youtube;

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::model::UnlockResult;

pub(crate) const UA_BROWSER: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 单个平台的检测逻辑。
#[async_trait]
pub trait StreamProbe: Send + Sync {
    fn platform(&self) -> &'static str;

    async fn probe(&self, client: &Client) -> UnlockResult;
}

/// 平台检测表。
pub struct ProbeRegistry {
    probes: Vec<Box<dyn StreamProbe>>,
}

impl ProbeRegistry {
    /// 构建包含全部内置平台的检测表。
    pub fn builtin() -> Self {
        Self {
            probes: vec![
                Box::new(youtube::YouTube),
                Box::new(openai::ChatGpt),
                Box::new(disney::DisneyPlus),
                Box::new(spotify::Spotify),
                Box::new(steam::Steam),
            ],
        }
    }

    pub fn platforms(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.platform()).collect()
    }

    fn select(&self, requested: &[String]) -> Vec<&dyn StreamProbe> {
        let want_all =
            requested.is_empty() || requested.iter().any(|p| p.eq_ignore_ascii_case("all"));
        self.probes
            .iter()
            .filter(|p| {
                want_all
                    || requested
                        .iter()
                        .any(|r| r.eq_ignore_ascii_case(p.platform()))
            })
            .map(|b| b.as_ref())
            .collect()
    }

    /// 并发执行选中平台的检测，返回按平台名（小写）索引的结果。
    pub async fn run(
        &self,
        client: &Client,
        requested: &[String],
        concurrency: usize,
    ) -> BTreeMap<String, UnlockResult> {
        let concurrency = if concurrency == 0 { 5 } else { concurrency };
        let selected = self.select(requested);
        debug!(
            "开始流媒体并发检测，并发数: {}，平台数: {}",
            concurrency,
            selected.len()
        );

        let results: Vec<UnlockResult> = futures::stream::iter(selected)
            .map(|probe| async move { probe.probe(client).await })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let mut map = BTreeMap::new();
        for r in results {
            debug!(
                "检测结果: {} - 状态: {:?}, 区域: {}, 信息: {}",
                r.platform, r.status, r.region, r.info
            );
            map.entry(r.platform.to_lowercase()).or_insert(r);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_five_platforms() {
        let registry = ProbeRegistry::builtin();
        let names = registry.platforms();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"YouTube"));
        assert!(names.contains(&"ChatGPT"));
        assert!(names.contains(&"Disney+"));
        assert!(names.contains(&"Spotify"));
        assert!(names.contains(&"Steam"));
    }

    #[test]
    fn selection_is_case_insensitive() {
        let registry = ProbeRegistry::builtin();
        let picked = registry.select(&["youtube".to_string(), "STEAM".to_string()]);
        let names: Vec<_> = picked.iter().map(|p| p.platform()).collect();
        assert_eq!(names, vec!["YouTube", "Steam"]);
    }

    #[test]
    fn all_keyword_selects_everything() {
        let registry = ProbeRegistry::builtin();
        assert_eq!(registry.select(&["all".to_string()]).len(), 5);
        assert_eq!(registry.select(&[]).len(), 5);
    }

    #[tokio::test]
    async fn unknown_platform_runs_nothing() {
        let registry = ProbeRegistry::builtin();
        let client = Client::new();
        let results = registry
            .run(&client, &["nonexistent".to_string()], 4)
            .await;
        assert!(results.is_empty());
    }
}
