//! ssr 链接：整段 URL 安全 base64。
//!
//! 内层格式 `host:port:protocol:cipher:obfs:b64(password)/?params`，
//! 参数值全部再套一层无填充 base64。

use crate::error::LinkError;
use crate::link::util::{b64_decode_str, b64_encode_url};
use crate::model::proxy::{NamedProxy, ProxyConfig, SsrConfig};

pub fn encode(name: &str, c: &SsrConfig) -> Result<String, LinkError> {
    if c.server.is_empty() {
        return Err(LinkError::MissingField("server"));
    }
    if c.port == 0 {
        return Err(LinkError::MissingField("port"));
    }
    if c.cipher.is_empty() {
        return Err(LinkError::MissingField("cipher"));
    }
    if c.password.is_empty() {
        return Err(LinkError::MissingField("password"));
    }

    let protocol = if c.protocol.is_empty() { "origin" } else { &c.protocol };
    let obfs = if c.obfs.is_empty() { "plain" } else { &c.obfs };
    let mut inner = format!(
        "{}:{}:{}:{}:{}:{}",
        c.server,
        c.port,
        protocol,
        c.cipher,
        obfs,
        b64_encode_url(&c.password)
    );

    let mut params = Vec::new();
    if let Some(v) = c.obfs_param.as_deref().filter(|v| !v.is_empty()) {
        params.push(format!("obfsparam={}", b64_encode_url(v)));
    }
    if let Some(v) = c.protocol_param.as_deref().filter(|v| !v.is_empty()) {
        params.push(format!("protoparam={}", b64_encode_url(v)));
    }
    if !name.is_empty() {
        params.push(format!("remarks={}", b64_encode_url(name)));
    }
    if let Some(v) = c.group.as_deref().filter(|v| !v.is_empty()) {
        params.push(format!("group={}", b64_encode_url(v)));
    }
    if !params.is_empty() {
        inner.push_str("/?");
        inner.push_str(&params.join("&"));
    }

    Ok(format!("ssr://{}", b64_encode_url(inner)))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let body = link.strip_prefix("ssr://").ok_or(LinkError::SchemeMismatch("ssr"))?;
    let inner = b64_decode_str(body)?;

    let (main, param_str) = match inner.split_once("/?") {
        Some((m, p)) => (m, Some(p)),
        None => (inner.as_str(), None),
    };

    let parts: Vec<&str> = main.splitn(6, ':').collect();
    if parts.len() < 6 {
        return Err(LinkError::Malformed("字段数不足"));
    }
    let port: u16 = parts[1].parse().map_err(|_| LinkError::InvalidPort(parts[1].to_string()))?;
    let password = b64_decode_str(parts[5])?;

    let mut name = String::new();
    let mut obfs_param = None;
    let mut protocol_param = None;
    let mut group = None;
    if let Some(param_str) = param_str {
        for pair in param_str.split('&') {
            let Some((k, v)) = pair.split_once('=') else { continue };
            let Ok(v) = b64_decode_str(v) else { continue };
            match k {
                "obfsparam" => obfs_param = Some(v),
                "protoparam" => protocol_param = Some(v),
                "remarks" => name = v,
                "group" => group = Some(v),
                _ => {}
            }
        }
    }

    let config = SsrConfig {
        server: parts[0].to_string(),
        port,
        cipher: parts[3].to_string(),
        password,
        protocol: parts[2].to_string(),
        obfs: parts[4].to_string(),
        obfs_param: obfs_param.filter(|v| !v.is_empty()),
        protocol_param: protocol_param.filter(|v| !v.is_empty()),
        group: group.filter(|v| !v.is_empty()),
        udp: false,
    };
    Ok(NamedProxy::new(name, ProxyConfig::ShadowsocksR(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_obfs_params() {
        let cfg = SsrConfig {
            server: "ssr.example.com".into(),
            port: 8080,
            cipher: "aes-256-cfb".into(),
            password: "密码123".into(),
            protocol: "auth_aes128_md5".into(),
            obfs: "tls1.2_ticket_auth".into(),
            obfs_param: Some("cloudfront.net".into()),
            protocol_param: Some("1234:abcd".into()),
            group: Some("测试组".into()),
            udp: false,
        };
        let link = encode("SSR 节点", &cfg).unwrap();
        assert!(link.starts_with("ssr://"));
        let named = decode(&link).unwrap();
        assert_eq!(named.name, "SSR 节点");
        assert_eq!(named.config, ProxyConfig::ShadowsocksR(cfg));
    }

    #[test]
    fn missing_remarks_leaves_name_empty() {
        let cfg = SsrConfig {
            server: "1.2.3.4".into(),
            port: 443,
            cipher: "rc4-md5".into(),
            password: "pw".into(),
            protocol: "origin".into(),
            obfs: "plain".into(),
            ..Default::default()
        };
        let link = encode("", &cfg).unwrap();
        let named = decode(&link).unwrap();
        assert!(named.name.is_empty());
        assert_eq!(named.endpoint(), "1.2.3.4:443");
    }

    #[test]
    fn short_main_section_is_malformed() {
        let link = format!("ssr://{}", b64_encode_url("host:443:origin"));
        assert!(matches!(decode(&link), Err(LinkError::Malformed(_))));
    }
}
