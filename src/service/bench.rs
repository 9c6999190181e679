//! # 测速调度模块
//!
//! 控制整个节点队列的测速流程。
//!
//! 本模块提供以下功能：
//!
//! - 以信号量限制同时在测的节点数，逐个产出完整测速结论；
//! - 单节点内按阶段推进：连通性预检、延迟探测、解锁与落地 IP、吞吐探测；
//! - 连通性预检任一端点通过即可，全部失败按 100% 丢包记录；
//! - 丢包过半跳过解锁与吞吐阶段；
//! - 快速模式只保留延迟阶段，跳过吞吐；
//! - 输出各阶段的进度日志与最终统计。
//!
//! ## 主要类型
//!
//! - BenchRunner：持有配置、拨号器与解锁检测表的调度器；
//! - run_all：测完整个队列并收集结果。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::model::{AppConfig, BenchResult, IpInfo, LatencyStats, NamedProxy};
use crate::service::dialer::ProxyDialer;
use crate::service::unlock::ProbeRegistry;
use crate::service::{geoip, stats, throughput};

/// 每个节点的延迟探测次数。
pub const LATENCY_PROBES: usize = 20;

/// 丢包率达到该值时跳过解锁与吞吐阶段。
const SHORT_CIRCUIT_LOSS: f64 = 50.0;

/// 节点测速调度器。所有依赖在启动时装配完成，测速期间只读。
#[derive(Clone)]
pub struct BenchRunner {
    config: Arc<AppConfig>,
    dialer: Arc<dyn ProxyDialer>,
    registry: Arc<ProbeRegistry>,
}

impl BenchRunner {
    pub fn new(
        config: Arc<AppConfig>,
        dialer: Arc<dyn ProxyDialer>,
        registry: Arc<ProbeRegistry>,
    ) -> Self {
        Self {
            config,
            dialer,
            registry,
        }
    }

    /// 测完整个节点队列，返回全部结论（完成顺序）。
    pub async fn run_all(&self, proxies: Vec<NamedProxy>) -> Result<Vec<BenchResult>, AppError> {
        let total = proxies.len();
        info!(
            "🚀 开始批量测速，共 {} 个节点，节点并发 {}",
            total, self.config.bench.test_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.config.bench.test_concurrent.max(1)));
        let failures = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<BenchResult>(total.max(1));

        for (i, proxy) in proxies.into_iter().enumerate() {
            let runner = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let failures = Arc::clone(&failures);
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.unwrap();
                let label = format!("[#{} {}]", i + 1, proxy.name);
                let start = Instant::now();

                let result = runner.bench_single(&label, &proxy).await;

                let ms = start.elapsed().as_millis();
                if result.latency.packet_loss >= 100.0 {
                    failures.fetch_add(1, Ordering::SeqCst);
                    warn!("🔴 {} 不可用，耗时 {}ms", label, ms);
                } else {
                    info!(
                        "🟢 {} 完成，延迟 {}，丢包 {}，耗时 {}ms",
                        label,
                        result.fmt_latency(),
                        result.fmt_packet_loss(),
                        ms
                    );
                }

                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(r) = rx.recv().await {
            results.push(r);
        }

        let failed = failures.load(Ordering::SeqCst);
        info!(
            "✅ 测速完成：总计 {} 条，有响应 {} 条，不可用 {} 条",
            total,
            total - failed,
            failed
        );
        Ok(results)
    }

    /// 单节点完整流程。所有失败都折算进结论本身，不向上抛错。
    async fn bench_single(&self, label: &str, proxy: &NamedProxy) -> BenchResult {
        let mut result = BenchResult::new(&proxy.name, proxy.config.clone());

        let client = match self
            .dialer
            .http_client(proxy, self.config.bench.timeout_duration())
            .await
        {
            Ok(c) => c,
            Err(e) => {
                error!("❌ {} 构建测速客户端失败: {}", label, e);
                result.latency.packet_loss = 100.0;
                return result;
            }
        };

        if !self.check_connectivity(&client).await {
            debug!("{} 连通性预检未通过", label);
            result.latency.packet_loss = 100.0;
            return result;
        }

        info!(
            "📡 {} 开始延迟探测，测速端点：{}",
            label, self.config.bench.server_url
        );
        result.latency = self.probe_latency(&client).await;

        if result.latency.packet_loss >= SHORT_CIRCUIT_LOSS {
            return result;
        }

        let unlock_cfg = &self.config.unlock;
        let (unlock_results, ip_info) = futures::join!(
            async {
                if unlock_cfg.enabled() {
                    self.registry
                        .run(&client, &unlock_cfg.platforms, unlock_cfg.concurrent)
                        .await
                } else {
                    BTreeMap::new()
                }
            },
            async {
                match geoip::lookup(&client, true).await {
                    Ok(info) => info,
                    Err(e) => {
                        debug!("{} 获取落地 IP 失败: {}", label, e);
                        IpInfo::default()
                    }
                }
            }
        );
        result.unlock_results = unlock_results;
        result.ip_info = ip_info;

        if self.config.bench.fast {
            return result;
        }

        let (down, up) = throughput::run(
            &client,
            &self.config.bench.server_url,
            self.config.bench.download_size,
            self.config.bench.upload_size,
            self.config.bench.concurrent,
        )
        .await;
        result.download_size = down.bytes;
        result.download_time = down.time;
        result.download_speed = down.speed;
        result.upload_size = up.bytes;
        result.upload_time = up.time;
        result.upload_speed = up.speed;

        result
    }

    /// 连通性预检：任一端点返回成功即通过。列表为空视为通过。
    async fn check_connectivity(&self, client: &Client) -> bool {
        if self.config.bench.connectivity_urls.is_empty() {
            return true;
        }
        for url in &self.config.bench.connectivity_urls {
            match client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => return true,
                Ok(resp) => debug!("连通性端点 {} 返回 {}", url, resp.status()),
                Err(e) => debug!("连通性端点 {} 请求失败: {}", url, e),
            }
        }
        false
    }

    /// 延迟探测：固定次数的并发零字节请求，起始时刻随机错开。
    async fn probe_latency(&self, client: &Client) -> LatencyStats {
        let (tx, mut rx) = mpsc::channel::<Option<Duration>>(LATENCY_PROBES);

        for _ in 0..LATENCY_PROBES {
            let tx = tx.clone();
            let client = client.clone();
            let url = format!("{}/__down?bytes=0", self.config.bench.server_url);

            tokio::spawn(async move {
                sleep(Duration::from_millis(rand::random_range(10..210))).await;

                let start = Instant::now();
                let outcome = match client.get(&url).send().await {
                    Ok(resp) if resp.status() == StatusCode::OK => Some(start.elapsed()),
                    _ => None,
                };
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut samples = Vec::with_capacity(LATENCY_PROBES);
        while let Some(outcome) = rx.recv().await {
            if let Some(d) = outcome {
                samples.push(d);
            }
        }

        stats::compute_latency_stats(&samples, LATENCY_PROBES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::proxy::{ProxyConfig, TrojanConfig};
    use crate::service::dialer::GatewayDialer;

    fn local_proxy(name: &str) -> NamedProxy {
        NamedProxy::new(
            name,
            ProxyConfig::Trojan(TrojanConfig {
                server: "127.0.0.1".into(),
                port: 9,
                password: "pw".into(),
                ..Default::default()
            }),
        )
    }

    fn offline_runner(connectivity_urls: Vec<String>) -> BenchRunner {
        let mut config = AppConfig::default();
        config.bench.server_url = "http://127.0.0.1:9".to_string();
        config.bench.timeout = 1;
        config.bench.connectivity_urls = connectivity_urls;
        BenchRunner::new(
            Arc::new(config),
            Arc::new(GatewayDialer::new("")),
            Arc::new(ProbeRegistry::builtin()),
        )
    }

    #[tokio::test]
    async fn unreachable_endpoint_counts_full_packet_loss() {
        let runner = offline_runner(Vec::new());
        let proxy = local_proxy("不可达节点");

        let result = runner.bench_single("[#1 不可达节点]", &proxy).await;
        assert_eq!(result.latency.packet_loss, 100.0);
        assert!(result.latency.average.is_zero());
        assert_eq!(result.download_speed, 0.0);
        assert!(result.unlock_results.is_empty());
    }

    #[tokio::test]
    async fn failed_connectivity_gate_aborts_early() {
        let runner = offline_runner(vec!["http://127.0.0.1:9/generate_204".to_string()]);
        let proxy = local_proxy("被墙节点");

        let result = runner.bench_single("[#1 被墙节点]", &proxy).await;
        assert_eq!(result.latency.packet_loss, 100.0);
        assert!(result.latency.jitter.is_zero());
    }

    #[tokio::test]
    async fn run_all_returns_one_result_per_proxy() {
        let runner = offline_runner(vec!["http://127.0.0.1:9/generate_204".to_string()]);
        let proxies = vec![local_proxy("甲"), local_proxy("乙"), local_proxy("丙")];

        let results = runner.run_all(proxies).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.latency.packet_loss == 100.0));
    }
}
