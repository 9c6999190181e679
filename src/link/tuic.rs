//! tuic 链接：`tuic://password@host:port?uuid=...#name`。

use crate::error::LinkError;
use crate::link::util::{build_base, build_query, finish_link, is_truthy, opt, parse_userinfo_link};
use crate::model::proxy::{NamedProxy, ProxyConfig, TuicConfig};

pub fn encode(name: &str, c: &TuicConfig) -> Result<String, LinkError> {
    let base = build_base("tuic", &c.password, "password", &c.server, c.port)?;

    let mut pairs: Vec<(&str, String)> = Vec::new();
    pairs.push(("uuid", c.uuid.clone()));
    pairs.push(("sni", c.sni.clone().unwrap_or_default()));
    pairs.push(("alpn", c.alpn.join(",")));
    if c.skip_cert_verify {
        pairs.push(("allowInsecure", "1".to_string()));
    }
    pairs.push(("fp", c.client_fingerprint.clone().unwrap_or_default()));
    pairs.push(("congestion-controller", c.congestion_controller.clone().unwrap_or_default()));
    pairs.push(("udp-relay-mode", c.udp_relay_mode.clone().unwrap_or_default()));

    Ok(finish_link(base, build_query(&pairs), name))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let rest = link.strip_prefix("tuic://").ok_or(LinkError::SchemeMismatch("tuic"))?;
    let parts = parse_userinfo_link(rest)?;
    if parts.userinfo.is_empty() {
        return Err(LinkError::MissingField("password"));
    }

    let q = &parts.query;
    let config = TuicConfig {
        server: parts.host,
        port: parts.port,
        uuid: q.get("uuid").cloned().unwrap_or_default(),
        password: parts.userinfo,
        sni: q.get("sni").cloned().and_then(opt),
        alpn: q
            .get("alpn")
            .map(|a| a.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
        skip_cert_verify: is_truthy(q.get("allowInsecure")),
        udp_relay_mode: q.get("udp-relay-mode").cloned().and_then(opt),
        congestion_controller: q.get("congestion-controller").cloned().and_then(opt),
        client_fingerprint: q.get("fp").cloned().and_then(opt),
    };
    Ok(NamedProxy::new(parts.name, ProxyConfig::Tuic(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_congestion_controller() {
        let cfg = TuicConfig {
            server: "tu.example.com".into(),
            port: 443,
            uuid: "c4d5e6f7-a8b9-4012-9cde-f23456789012".into(),
            password: "pw".into(),
            sni: Some("tu.example.com".into()),
            alpn: vec!["h3".into()],
            congestion_controller: Some("bbr".into()),
            udp_relay_mode: Some("native".into()),
            ..Default::default()
        };
        let link = encode("TUIC 节点", &cfg).unwrap();
        let named = decode(&link).unwrap();
        assert_eq!(named.name, "TUIC 节点");
        assert_eq!(named.config, ProxyConfig::Tuic(cfg));
    }

    #[test]
    fn uuid_param_is_optional() {
        let named = decode("tuic://pw@tu.example.com:443?sni=a.com#t").unwrap();
        match named.config {
            ProxyConfig::Tuic(t) => assert!(t.uuid.is_empty()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
