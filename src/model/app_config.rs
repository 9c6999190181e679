use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 应用配置。来源优先级：内置默认值 < `Config.toml` < 命令行参数。
///
/// 在 `main` 中装配完成后按引用下发，不做全局静态存储。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bench: BenchConfig,
    #[serde(default)]
    pub unlock: UnlockConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LoggingConfig,
    #[serde(default)]
    pub dialer: DialerConfig,
}

/// 测速参数。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchConfig {
    /// 测速服务地址，需提供 `/__down` 与 `/__up` 两个端点。
    pub server_url: String,

    /// 下载总字节数，平均分摊到每个并发子连接。
    pub download_size: u64,

    /// 上传总字节数。
    pub upload_size: u64,

    /// 单次 HTTP 请求超时（秒），统一作用于所有探测。
    pub timeout: u64,

    /// 单节点吞吐子连接数。
    pub concurrent: usize,

    /// 同时测速的节点数。
    pub test_concurrent: usize,

    /// 快速模式：只测延迟，跳过吞吐。
    pub fast: bool,

    /// 连通性预检端点（generate_204 风格），留空则跳过预检。
    pub connectivity_urls: Vec<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            server_url: "https://speed.cloudflare.com".to_string(),
            download_size: 50 * 1024 * 1024,
            upload_size: 20 * 1024 * 1024,
            timeout: 5,
            concurrent: 4,
            test_concurrent: 2,
            fast: false,
            connectivity_urls: vec![
                "http://www.gstatic.com/generate_204".to_string(),
                "http://cp.cloudflare.com/generate_204".to_string(),
            ],
        }
    }
}

impl BenchConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// 非法取值回退到安全默认，避免下游出现除零或空转。
    pub fn normalize(&mut self) {
        if self.concurrent == 0 {
            self.concurrent = 1;
        }
        if self.test_concurrent == 0 {
            self.test_concurrent = 2;
        }
        if self.download_size == 0 {
            self.download_size = 100 * 1024 * 1024;
        }
        if self.upload_size == 0 {
            self.upload_size = 10 * 1024 * 1024;
        }
        if self.timeout == 0 {
            self.timeout = 5;
        }
    }
}

/// 解锁检测参数。平台列表为空时完全跳过解锁阶段。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// 待检测平台，支持 `all` 或平台名列表（大小写不敏感）。
    pub platforms: Vec<String>,

    /// 平台探测并发数。
    pub concurrent: usize,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self { platforms: Vec::new(), concurrent: 8 }
    }
}

impl UnlockConfig {
    pub fn enabled(&self) -> bool {
        !self.platforms.is_empty()
    }
}

/// 结果筛选参数。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 节点名正则，加载阶段应用。
    pub name_regex: String,

    /// 延迟上限（毫秒），0 表示不限制。
    pub max_latency_ms: u64,

    /// 下载速度下限（MB/s），0 或快速模式下跳过。
    pub min_download_mbps: f64,

    /// 上传速度下限（MB/s）。
    pub min_upload_mbps: f64,

    /// 丢包率上限（百分比），始终生效。
    pub max_packet_loss: f64,

    /// 保留节点数上限，0 表示不截断。
    pub limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            name_regex: ".+".to_string(),
            max_latency_ms: 800,
            min_download_mbps: 5.0,
            min_upload_mbps: 0.0,
            max_packet_loss: 0.0,
            limit: 0,
        }
    }
}

/// 结果输出参数。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 链接清单输出路径，留空则不落盘。
    pub path: String,

    /// JSON 明细输出路径，留空则不输出。
    pub json_path: String,

    /// 重命名模式：none / add / overwrite。
    pub rename: String,

    /// 排序字段序列：latency / jitter / loss / download / upload / score。
    pub sort_by: Vec<String>,

    /// 评分策略：rank / normalized。
    pub score_policy: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "result.txt".to_string(),
            json_path: String::new(),
            rename: "none".to_string(),
            sort_by: vec!["score".to_string()],
            score_policy: "rank".to_string(),
        }
    }
}

/// 日志参数，控制台层按级别白名单过滤。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub console_levels: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_levels: vec!["info".to_string(), "warn".to_string(), "error".to_string()],
        }
    }
}

/// 拨号参数。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DialerConfig {
    /// 本地网关地址（http/socks5），留空则直连。
    pub gateway: String,
}

impl AppConfig {
    /// 读取配置文件。未显式指定路径时按约定查找 `Config.*`，
    /// 找不到退回内置默认值；显式指定的路径必须存在。
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let builder = match path {
            Some(p) => config::Config::builder().add_source(config::File::with_name(p)),
            None => config::Config::builder()
                .add_source(config::File::with_name("Config").required(false)),
        };
        let config = builder.build()?;
        let config = config.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bench.server_url, "https://speed.cloudflare.com");
        assert_eq!(cfg.bench.download_size, 50 * 1024 * 1024);
        assert_eq!(cfg.bench.test_concurrent, 2);
        assert_eq!(cfg.filter.max_latency_ms, 800);
        assert_eq!(cfg.filter.max_packet_loss, 0.0);
        assert_eq!(cfg.output.sort_by, vec!["score"]);
        assert!(!cfg.unlock.enabled());
    }

    #[test]
    fn normalize_repairs_zero_values() {
        let mut bench = BenchConfig { concurrent: 0, download_size: 0, ..Default::default() };
        bench.normalize();
        assert_eq!(bench.concurrent, 1);
        assert_eq!(bench.download_size, 100 * 1024 * 1024);
    }
}
