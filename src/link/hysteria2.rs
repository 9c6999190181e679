//! hysteria2 链接：`hysteria2://password@host:port?params#name`，
//! 解码同时接受 `hy2://` 前缀。

use crate::error::LinkError;
use crate::link::util::{
    bool_flag, build_base, build_query, finish_link, is_truthy, opt, parse_userinfo_link,
};
use crate::model::proxy::{Hysteria2Config, NamedProxy, ProxyConfig};

pub fn encode(name: &str, c: &Hysteria2Config) -> Result<String, LinkError> {
    let base = build_base("hysteria2", &c.password, "password", &c.server, c.port)?;

    let pairs: Vec<(&str, String)> = vec![
        // insecure 固定输出，0/1 都写明
        ("insecure", bool_flag(c.skip_cert_verify)),
        ("sni", c.sni.clone().unwrap_or_default()),
        ("mport", c.ports.clone().unwrap_or_default()),
        ("obfs", c.obfs.clone().unwrap_or_default()),
        ("obfs-password", c.obfs_password.clone().unwrap_or_default()),
        ("upmbps", c.up.clone().unwrap_or_default()),
        ("downmbps", c.down.clone().unwrap_or_default()),
        ("alpn", c.alpn.join(",")),
    ];

    Ok(finish_link(base, build_query(&pairs), name))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let rest = link
        .strip_prefix("hysteria2://")
        .or_else(|| link.strip_prefix("hy2://"))
        .ok_or(LinkError::SchemeMismatch("hysteria2"))?;
    let parts = parse_userinfo_link(rest)?;
    if parts.userinfo.is_empty() {
        return Err(LinkError::MissingField("password"));
    }

    let q = &parts.query;
    let config = Hysteria2Config {
        server: parts.host,
        port: parts.port,
        password: parts.userinfo,
        ports: q.get("mport").cloned().and_then(opt),
        obfs: q.get("obfs").cloned().and_then(opt),
        obfs_password: q.get("obfs-password").cloned().and_then(opt),
        sni: q.get("sni").cloned().and_then(opt),
        skip_cert_verify: is_truthy(q.get("insecure")),
        up: q.get("upmbps").cloned().and_then(opt),
        down: q.get("downmbps").cloned().and_then(opt),
        alpn: q
            .get("alpn")
            .map(|a| a.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
    };
    Ok(NamedProxy::new(parts.name, ProxyConfig::Hysteria2(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_obfs_and_ports() {
        let cfg = Hysteria2Config {
            server: "hy.example.com".into(),
            port: 443,
            password: "pw123".into(),
            ports: Some("30000-40000".into()),
            obfs: Some("salamander".into()),
            obfs_password: Some("obfs-pw".into()),
            sni: Some("hy.example.com".into()),
            skip_cert_verify: true,
            up: Some("100".into()),
            down: Some("500".into()),
            alpn: vec!["h3".into()],
        };
        let link = encode("Hy2 节点", &cfg).unwrap();
        assert!(link.contains("insecure=1"));
        let named = decode(&link).unwrap();
        assert_eq!(named.config, ProxyConfig::Hysteria2(cfg));
    }

    #[test]
    fn hy2_prefix_is_accepted() {
        let named = decode("hy2://pw@h.example.com:8443?insecure=0&sni=h.example.com#别名").unwrap();
        assert_eq!(named.name, "别名");
        match named.config {
            ProxyConfig::Hysteria2(h) => {
                assert!(!h.skip_cert_verify);
                assert_eq!(h.port, 8443);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn wrong_scheme_is_rejected() {
        assert!(matches!(
            decode("hysteria://pw@h:443"),
            Err(LinkError::SchemeMismatch("hysteria2"))
        ));
    }
}
