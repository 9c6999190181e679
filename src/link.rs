//! # 链接编解码模块
//!
//! 分享链接与类型化节点配置之间的双向转换：
//! - **解码**：订阅导入时把各家链接读成 [`NamedProxy`]
//! - **编码**：测速筛选后把保留节点重新导出为链接
//!
//! 支持 vmess / vless / trojan / ss / ssr / hysteria2（含 hy2 别名）/ tuic
//! 七个协议族。编码端对缺失必填字段报 [`LinkError`]，由调用方决定兜底；
//! 解码端对 base64、百分号编码尽量从宽。

pub mod hysteria2;
pub mod shadowsocks;
pub mod ssr;
pub mod trojan;
pub mod tuic;
pub(crate) mod util;
pub mod vless;
pub mod vmess;

use crate::error::LinkError;
use crate::model::proxy::{NamedProxy, ProxyConfig};

const SCHEMES: [&str; 8] =
    ["vmess://", "vless://", "trojan://", "ss://", "ssr://", "hysteria2://", "hy2://", "tuic://"];

/// 行内容是否像一条受支持的分享链接。
pub fn looks_like_link(line: &str) -> bool {
    let line = line.trim_start();
    SCHEMES.iter().any(|s| line.starts_with(s))
}

/// 解析一条分享链接。名称为空时回填 `server:port`。
pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let link = link.trim();
    let mut named = if link.starts_with("ssr://") {
        ssr::decode(link)?
    } else if link.starts_with("ss://") {
        shadowsocks::decode(link)?
    } else if link.starts_with("vmess://") {
        vmess::decode(link)?
    } else if link.starts_with("vless://") {
        vless::decode(link)?
    } else if link.starts_with("trojan://") {
        trojan::decode(link)?
    } else if link.starts_with("hysteria2://") || link.starts_with("hy2://") {
        hysteria2::decode(link)?
    } else if link.starts_with("tuic://") {
        tuic::decode(link)?
    } else {
        return Err(LinkError::Malformed("不支持的链接协议"));
    };

    if named.name.trim().is_empty() {
        named.name = named.endpoint();
    }
    Ok(named)
}

/// 把节点配置编码回分享链接。
pub fn encode(name: &str, config: &ProxyConfig) -> Result<String, LinkError> {
    match config {
        ProxyConfig::Vmess(c) => vmess::encode(name, c),
        ProxyConfig::Vless(c) => vless::encode(name, c),
        ProxyConfig::Trojan(c) => trojan::encode(name, c),
        ProxyConfig::Shadowsocks(c) => shadowsocks::encode(name, c),
        ProxyConfig::ShadowsocksR(c) => ssr::encode(name, c),
        ProxyConfig::Hysteria2(c) => hysteria2::encode(name, c),
        ProxyConfig::Tuic(c) => tuic::encode(name, c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::proxy::TrojanConfig;

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(matches!(
            decode("socks5://1.2.3.4:1080"),
            Err(LinkError::Malformed(_))
        ));
        assert!(!looks_like_link("proxies:"));
        assert!(looks_like_link("  hy2://pw@h:443"));
    }

    #[test]
    fn empty_fragment_falls_back_to_endpoint() {
        let named = decode("trojan://pw@fallback.example.com:8443").unwrap();
        assert_eq!(named.name, "fallback.example.com:8443");
    }

    #[test]
    fn encode_dispatches_by_variant() {
        let cfg = ProxyConfig::Trojan(TrojanConfig {
            server: "t.example.com".into(),
            port: 443,
            password: "pw".into(),
            ..Default::default()
        });
        let link = encode("名称 A", &cfg).unwrap();
        assert!(link.starts_with("trojan://pw@t.example.com:443"));
        let back = decode(&link).unwrap();
        assert_eq!(back.name, "名称 A");
        assert_eq!(back.config, cfg);
    }
}
