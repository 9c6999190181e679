pub mod app_config;
pub mod proxy;
pub mod result;

pub use app_config::AppConfig;
pub use proxy::{NamedProxy, ProxyConfig};
pub use result::{BenchResult, IpInfo, LatencyStats, UnlockResult, UnlockStatus};
