//! trojan 链接：`trojan://password@host:port?params#name`。

use crate::error::LinkError;
use crate::link::util::{build_base, build_query, finish_link, is_truthy, opt, parse_userinfo_link};
use crate::model::proxy::{GrpcOptions, NamedProxy, ProxyConfig, TrojanConfig, WsOptions};

pub fn encode(name: &str, c: &TrojanConfig) -> Result<String, LinkError> {
    let base = build_base("trojan", &c.password, "password", &c.server, c.port)?;

    let network = c.network.clone().unwrap_or_default();
    let mut pairs: Vec<(&str, String)> = Vec::new();
    pairs.push(("sni", c.sni.clone().unwrap_or_default()));
    pairs.push(("alpn", c.alpn.join(",")));
    if c.skip_cert_verify {
        pairs.push(("allowInsecure", "1".to_string()));
    }
    pairs.push(("type", network.clone()));
    match network.as_str() {
        "ws" => {
            let ws = c.ws_opts.as_ref();
            pairs.push(("host", ws.and_then(|w| w.host()).unwrap_or_default().to_string()));
            pairs.push(("path", ws.and_then(|w| w.path.clone()).unwrap_or_default()));
        }
        "grpc" => {
            pairs.push((
                "serviceName",
                c.grpc_opts.as_ref().and_then(|g| g.service_name.clone()).unwrap_or_default(),
            ));
        }
        _ => {}
    }

    Ok(finish_link(base, build_query(&pairs), name))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let rest = link.strip_prefix("trojan://").ok_or(LinkError::SchemeMismatch("trojan"))?;
    let parts = parse_userinfo_link(rest)?;
    if parts.userinfo.is_empty() {
        return Err(LinkError::MissingField("password"));
    }

    let q = &parts.query;
    let network = q.get("type").cloned().filter(|t| !t.is_empty());

    let mut config = TrojanConfig {
        server: parts.host,
        port: parts.port,
        password: parts.userinfo,
        sni: q
            .get("sni")
            .cloned()
            .and_then(opt)
            .or_else(|| q.get("peer").cloned().and_then(opt)),
        alpn: q
            .get("alpn")
            .map(|a| a.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
        skip_cert_verify: is_truthy(q.get("allowInsecure")),
        udp: false,
        network: network.clone(),
        ws_opts: None,
        grpc_opts: None,
    };

    match network.as_deref() {
        Some("ws") => {
            config.ws_opts = WsOptions::from_parts(
                q.get("path").cloned().and_then(opt),
                q.get("host").cloned().and_then(opt),
            );
        }
        Some("grpc") => {
            if let Some(service) = q.get("serviceName").cloned().and_then(opt) {
                config.grpc_opts = Some(GrpcOptions { service_name: Some(service) });
            }
        }
        _ => {}
    }

    Ok(NamedProxy::new(parts.name, ProxyConfig::Trojan(config)))
}
