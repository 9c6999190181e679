//! 拨号抽象。
//!
//! 协议握手本身交给外部代理能力完成，测速流程只通过 [`ProxyDialer`]
//! 取得一个经由目标节点出站的 HTTP 客户端，其余探测全部建立在
//! 该客户端之上。

use std::time::Duration;

use async_trait::async_trait;

use crate::model::proxy::NamedProxy;

#[async_trait]
pub trait ProxyDialer: Send + Sync {
    /// 为指定节点构造 HTTP 客户端，统一超时作用于每次请求。
    async fn http_client(
        &self,
        proxy: &NamedProxy,
        timeout: Duration,
    ) -> anyhow::Result<reqwest::Client>;
}

/// 经本地网关出站的默认实现。
///
/// 网关应是一个已按节点选路的本地代理入口（http/socks5）。
/// 网关留空时直连，用于基线测速与离线验证。
pub struct GatewayDialer {
    gateway: Option<String>,
}

impl GatewayDialer {
    pub fn new(gateway: impl Into<String>) -> Self {
        let gateway = gateway.into();
        Self { gateway: if gateway.is_empty() { None } else { Some(gateway) } }
    }
}

#[async_trait]
impl ProxyDialer for GatewayDialer {
    async fn http_client(
        &self,
        _proxy: &NamedProxy,
        timeout: Duration,
    ) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(gw) = &self.gateway {
            builder = builder.proxy(reqwest::Proxy::all(gw)?);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::proxy::{ProxyConfig, TrojanConfig};

    #[tokio::test]
    async fn direct_client_builds_without_gateway() {
        let dialer = GatewayDialer::new("");
        let proxy = NamedProxy::new(
            "t",
            ProxyConfig::Trojan(TrojanConfig {
                server: "a.com".into(),
                port: 443,
                password: "p".into(),
                ..Default::default()
            }),
        );
        assert!(dialer.http_client(&proxy, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn socks_gateway_is_accepted() {
        let dialer = GatewayDialer::new("socks5://127.0.0.1:7890");
        let proxy = NamedProxy::new(
            "t",
            ProxyConfig::Trojan(TrojanConfig {
                server: "a.com".into(),
                port: 443,
                password: "p".into(),
                ..Default::default()
            }),
        );
        assert!(dialer.http_client(&proxy, Duration::from_secs(1)).await.is_ok());
    }
}
