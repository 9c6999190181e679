//! vless 链接：`vless://uuid@host:port?params#name`。

use crate::error::LinkError;
use crate::link::util::{
    build_base, build_query, finish_link, is_truthy, opt, parse_userinfo_link,
};
use crate::model::proxy::{
    GrpcOptions, NamedProxy, ProxyConfig, RealityOptions, VlessConfig, WsOptions,
};

pub fn encode(name: &str, c: &VlessConfig) -> Result<String, LinkError> {
    if c.uuid.is_empty() {
        return Err(LinkError::MissingField("uuid"));
    }
    let base = build_base("vless", &c.uuid, "uuid", &c.server, c.port)?;

    let network = c.network.clone().unwrap_or_default();
    let mut pairs: Vec<(&str, String)> = Vec::new();
    pairs.push(("flow", c.flow.clone().unwrap_or_default()));
    if c.udp {
        pairs.push(("udp", "true".to_string()));
    }
    // Reality 优先于普通 TLS
    if let Some(reality) = &c.reality_opts {
        pairs.push(("security", "reality".to_string()));
        pairs.push(("pbk", reality.public_key.clone()));
        pairs.push(("sid", reality.short_id.clone()));
    } else if c.tls {
        pairs.push(("security", "tls".to_string()));
    }
    pairs.push(("fp", c.client_fingerprint.clone().unwrap_or_default()));
    pairs.push(("alpn", c.alpn.join(",")));
    pairs.push(("sni", c.servername.clone().unwrap_or_default()));
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
        _ => {
            pairs.push(("peer", c.servername.clone().unwrap_or_default()));
        }
    }

    Ok(finish_link(base, build_query(&pairs), name))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let rest = link.strip_prefix("vless://").ok_or(LinkError::SchemeMismatch("vless"))?;
    let parts = parse_userinfo_link(rest)?;
    if parts.userinfo.is_empty() {
        return Err(LinkError::MissingField("uuid"));
    }

    let q = &parts.query;
    let security = q.get("security").map(String::as_str).unwrap_or("");
    let network = q.get("type").cloned().filter(|t| !t.is_empty());
    let sni = q
        .get("sni")
        .cloned()
        .and_then(opt)
        .or_else(|| q.get("peer").cloned().and_then(opt));

    let reality_opts = q.get("pbk").cloned().and_then(opt).map(|public_key| RealityOptions {
        public_key,
        short_id: q.get("sid").cloned().unwrap_or_default(),
    });

    let mut config = VlessConfig {
        server: parts.host,
        port: parts.port,
        uuid: parts.userinfo,
        flow: q.get("flow").cloned().and_then(opt),
        udp: is_truthy(q.get("udp")),
        tls: matches!(security, "tls" | "reality") || reality_opts.is_some(),
        servername: sni,
        network: network.clone(),
        reality_opts,
        ws_opts: None,
        grpc_opts: None,
        alpn: q
            .get("alpn")
            .map(|a| a.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
        skip_cert_verify: false,
        client_fingerprint: q.get("fp").cloned().and_then(opt),
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

    Ok(NamedProxy::new(parts.name, ProxyConfig::Vless(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_ws_tls() {
        let cfg = VlessConfig {
            server: "vl.example.com".into(),
            port: 443,
            uuid: "b2c3d4e5-f6a7-4890-9abc-def012345678".into(),
            tls: true,
            servername: Some("vl.example.com".into()),
            network: Some("ws".into()),
            ws_opts: WsOptions::from_parts(Some("/path".into()), Some("cdn.example.com".into())),
            client_fingerprint: Some("chrome".into()),
            ..Default::default()
        };
        let link = encode("香港|vless", &cfg).unwrap();
        assert!(link.starts_with("vless://b2c3d4e5-"));
        let named = decode(&link).unwrap();
        assert_eq!(named.name, "香港|vless");
        assert_eq!(named.config, ProxyConfig::Vless(cfg));
    }

    #[test]
    fn reality_params_map_to_options() {
        let link = "vless://uuid-9@re.example.com:443?security=reality&pbk=pubkey123&sid=ab12&fp=chrome&sni=www.apple.com&type=tcp#RealityNode";
        let named = decode(link).unwrap();
        match named.config {
            ProxyConfig::Vless(v) => {
                assert!(v.tls);
                let reality = v.reality_opts.expect("reality opts");
                assert_eq!(reality.public_key, "pubkey123");
                assert_eq!(reality.short_id, "ab12");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn missing_uuid_is_rejected() {
        assert!(matches!(
            decode("vless://vl.example.com:443#x"),
            Err(LinkError::MissingField("uuid"))
        ));
    }
}
