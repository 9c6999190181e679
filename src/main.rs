mod common;
mod error;
mod link;
mod model;
mod report;
mod service;

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use crate::common::log::init_logging;
use crate::error::AppError;
use crate::model::AppConfig;
use crate::service::bench::BenchRunner;
use crate::service::dialer::GatewayDialer;
use crate::service::loader;
use crate::service::pipeline::{self, RenameMode};
use crate::service::stats::ScorePolicy;
use crate::service::unlock::ProbeRegistry;

/// 命令行参数。未指定的项沿用配置文件，配置文件也没有的走内置默认值。
#[derive(Parser, Debug)]
#[command(name = "proxy-arena", version, about = "代理节点批量测速与筛选工具")]
struct Cli {
    /// 节点来源：本地文件或 http(s) 订阅地址，可多次指定
    #[arg(short = 'c', long = "config", required = true)]
    sources: Vec<String>,

    /// 应用配置文件路径（TOML / YAML）
    #[arg(long = "app-config")]
    app_config: Option<String>,

    /// 节点名正则，只测匹配的节点
    #[arg(short = 'f', long = "filter")]
    filter_regex: Option<String>,

    /// 测速服务地址
    #[arg(long)]
    server_url: Option<String>,

    /// 下载测试总字节数
    #[arg(long)]
    download_size: Option<u64>,

    /// 上传测试总字节数
    #[arg(long)]
    upload_size: Option<u64>,

    /// 单次请求超时（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 单节点吞吐子连接数
    #[arg(long)]
    concurrent: Option<usize>,

    /// 同时测速的节点数
    #[arg(long)]
    test_concurrent: Option<usize>,

    /// 快速模式：只测延迟，跳过吞吐
    #[arg(long)]
    fast: bool,

    /// 流媒体解锁平台，逗号分隔，如 youtube,steam，all 表示全部
    #[arg(long, value_delimiter = ',')]
    unlock: Vec<String>,

    /// 延迟上限（毫秒），0 不限制
    #[arg(long)]
    max_latency: Option<u64>,

    /// 下载速度下限（MB/s）
    #[arg(long)]
    min_speed: Option<f64>,

    /// 上传速度下限（MB/s）
    #[arg(long)]
    min_upload_speed: Option<f64>,

    /// 丢包率上限（百分比）
    #[arg(long)]
    max_packet_loss: Option<f64>,

    /// 保留节点数上限，0 不截断
    #[arg(long)]
    limit: Option<usize>,

    /// 链接清单输出路径
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// JSON 明细输出路径
    #[arg(long)]
    json_output: Option<String>,

    /// 重命名模式：none / add / overwrite
    #[arg(long)]
    rename: Option<String>,

    /// 排序字段序列，逗号分隔，如 score 或 latency,download
    #[arg(long, value_delimiter = ',')]
    sort_by: Vec<String>,

    /// 本地网关地址（http/socks5），测速流量经由它转发
    #[arg(long)]
    gateway: Option<String>,
}

/// 命令行覆盖配置文件。只处理显式给出的参数。
fn merge_cli(config: &mut AppConfig, cli: &Cli) {
    if let Some(v) = &cli.filter_regex {
        config.filter.name_regex = v.clone();
    }
    if let Some(v) = &cli.server_url {
        config.bench.server_url = v.clone();
    }
    if let Some(v) = cli.download_size {
        config.bench.download_size = v;
    }
    if let Some(v) = cli.upload_size {
        config.bench.upload_size = v;
    }
    if let Some(v) = cli.timeout {
        config.bench.timeout = v;
    }
    if let Some(v) = cli.concurrent {
        config.bench.concurrent = v;
    }
    if let Some(v) = cli.test_concurrent {
        config.bench.test_concurrent = v;
    }
    if cli.fast {
        config.bench.fast = true;
    }
    if !cli.unlock.is_empty() {
        config.unlock.platforms = cli.unlock.clone();
    }
    if let Some(v) = cli.max_latency {
        config.filter.max_latency_ms = v;
    }
    if let Some(v) = cli.min_speed {
        config.filter.min_download_mbps = v;
    }
    if let Some(v) = cli.min_upload_speed {
        config.filter.min_upload_mbps = v;
    }
    if let Some(v) = cli.max_packet_loss {
        config.filter.max_packet_loss = v;
    }
    if let Some(v) = cli.limit {
        config.filter.limit = v;
    }
    if let Some(v) = &cli.output {
        config.output.path = v.clone();
    }
    if let Some(v) = &cli.json_output {
        config.output.json_path = v.clone();
    }
    if let Some(v) = &cli.rename {
        config.output.rename = v.clone();
    }
    if !cli.sort_by.is_empty() {
        config.output.sort_by = cli.sort_by.clone();
    }
    if let Some(v) = &cli.gateway {
        config.dialer.gateway = v.clone();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.app_config.as_deref())?;
    merge_cli(&mut config, &cli);
    config.bench.normalize();

    // 必须在第一条日志之前调用！
    init_logging(&config.log).expect("Failed to initialize logging");

    // 输出相关参数先行校验，避免测完才报错
    let sort_fields = pipeline::parse_sort_fields(&config.output.sort_by)?;
    let rename_mode = RenameMode::parse(&config.output.rename)
        .ok_or_else(|| AppError::ConfigError(format!("未知的重命名模式: {}", config.output.rename)))?;
    let policy = ScorePolicy::parse(&config.output.score_policy)
        .ok_or_else(|| AppError::ConfigError(format!("未知的评分策略: {}", config.output.score_policy)))?;

    info!("========== [节点加载阶段] ==========");
    let proxies = match loader::load_all(&cli.sources, &config.filter).await {
        Ok(xs) => xs,
        Err(e) => {
            error!("❌ 节点加载失败: {}", e);
            return Ok(());
        }
    };
    if proxies.is_empty() {
        error!("❌ 没有可测的节点，结束");
        return Ok(());
    }
    info!("✅ 待测节点 {} 个", proxies.len());

    info!("========== [节点测速阶段] ==========");
    let config = Arc::new(config);
    let dialer = Arc::new(GatewayDialer::new(config.dialer.gateway.clone()));
    let registry = Arc::new(ProbeRegistry::builtin());
    let runner = BenchRunner::new(Arc::clone(&config), dialer, registry);
    let mut results = runner.run_all(proxies).await?;

    info!("========== [结果输出阶段] ==========");
    pipeline::sort_results(&mut results, &sort_fields, policy, config.bench.fast);
    report::print_table(&results);

    let mut retained = pipeline::apply_filter(&results, &config.filter, config.bench.fast);
    info!("🔎 筛选后保留 {} / {} 个节点", retained.len(), results.len());
    pipeline::apply_rename(&mut retained, rename_mode);

    if !config.output.path.is_empty() {
        report::save_links(&retained, &config.output.path)?;
        info!("📄 链接清单已写入 {}", config.output.path);
    }
    if !config.output.json_path.is_empty() {
        report::save_json(&retained, &config.output.json_path)?;
        info!("📄 JSON 明细已写入 {}", config.output.json_path);
    }

    info!("========== [全部完成 ✅] ==========");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config_file_values() {
        let cli = Cli::parse_from([
            "proxy-arena",
            "-c",
            "nodes.yaml",
            "--fast",
            "--max-latency",
            "500",
            "--sort-by",
            "latency,download",
            "--unlock",
            "youtube,steam",
        ]);
        let mut config = AppConfig::default();
        merge_cli(&mut config, &cli);

        assert!(config.bench.fast);
        assert_eq!(config.filter.max_latency_ms, 500);
        assert_eq!(config.output.sort_by, vec!["latency", "download"]);
        assert_eq!(config.unlock.platforms, vec!["youtube", "steam"]);
        // 未出现在命令行的项保持默认
        assert_eq!(config.bench.timeout, 5);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let cli = Cli::parse_from(["proxy-arena", "-c", "nodes.yaml"]);
        let mut config = AppConfig::default();
        config.output.rename = "add".to_string();
        merge_cli(&mut config, &cli);

        assert_eq!(cli.sources, vec!["nodes.yaml"]);
        assert!(!config.bench.fast);
        assert_eq!(config.output.rename, "add");
    }
}
