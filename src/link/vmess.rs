//! vmess 链接：`vmess://` + base64(JSON 描述块)。

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LinkError;
use crate::link::util::{b64_decode_str, b64_encode, opt};
use crate::model::proxy::{GrpcOptions, NamedProxy, ProxyConfig, VmessConfig, WsOptions};

/// v2rayN 风格的 JSON 描述块。数字字段在野外常写成字符串，
/// 解码一律从宽，编码统一输出字符串形式。
#[derive(Debug, Default, Serialize, Deserialize)]
struct VmessBlob {
    #[serde(default, deserialize_with = "de_stringy", skip_serializing_if = "String::is_empty")]
    v: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    ps: String,

    #[serde(default)]
    add: String,

    #[serde(default, deserialize_with = "de_stringy")]
    port: String,

    #[serde(default)]
    id: String,

    #[serde(default, deserialize_with = "de_stringy", skip_serializing_if = "String::is_empty")]
    aid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    scy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    net: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    header_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tls: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sni: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    alpn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    fp: Option<String>,
}

pub fn encode(name: &str, c: &VmessConfig) -> Result<String, LinkError> {
    if c.server.is_empty() {
        return Err(LinkError::MissingField("server"));
    }
    if c.port == 0 {
        return Err(LinkError::MissingField("port"));
    }
    if c.uuid.is_empty() {
        return Err(LinkError::MissingField("uuid"));
    }

    let network = c.network.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| "tcp".to_string());
    let (host, path) = match network.as_str() {
        "ws" | "http" => {
            let ws = c.ws_opts.as_ref();
            (
                ws.and_then(|w| w.host()).map(str::to_string),
                ws.and_then(|w| w.path.clone()),
            )
        }
        "grpc" => (None, c.grpc_opts.as_ref().and_then(|g| g.service_name.clone())),
        _ => (None, None),
    };

    let cipher = if c.cipher.is_empty() { "auto".to_string() } else { c.cipher.clone() };
    let fp = if c.tls {
        Some(c.client_fingerprint.clone().filter(|f| !f.is_empty()).unwrap_or_else(|| "chrome".to_string()))
    } else {
        None
    };

    let blob = VmessBlob {
        v: "2".to_string(),
        ps: name.to_string(),
        add: c.server.clone(),
        port: c.port.to_string(),
        id: c.uuid.clone(),
        aid: c.alter_id.to_string(),
        scy: Some(cipher),
        net: Some(network),
        header_type: Some("none".to_string()),
        host: host.and_then(opt),
        path: path.and_then(opt),
        tls: Some(if c.tls { "tls" } else { "none" }.to_string()),
        sni: c.servername.clone().and_then(opt),
        alpn: opt(c.alpn.join(",")),
        fp,
    };

    let json = serde_json::to_string(&blob)?;
    Ok(format!("vmess://{}", b64_encode(json)))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let body = link.strip_prefix("vmess://").ok_or(LinkError::SchemeMismatch("vmess"))?;
    // 个别订阅会混入反引号
    let body = body.replace('`', "");
    let json = b64_decode_str(&body)?;
    let blob: VmessBlob = serde_json::from_str(&json)?;

    if blob.add.is_empty() {
        return Err(LinkError::MissingField("server"));
    }
    if blob.id.is_empty() {
        return Err(LinkError::MissingField("uuid"));
    }
    let port: u16 = blob.port.trim().parse().map_err(|_| LinkError::InvalidPort(blob.port.clone()))?;
    if port == 0 {
        return Err(LinkError::InvalidPort(blob.port.clone()));
    }

    let network = blob.net.clone().filter(|n| !n.is_empty());
    let tls = blob.tls.as_deref() == Some("tls");

    let mut config = VmessConfig {
        server: blob.add.clone(),
        port,
        uuid: blob.id.clone(),
        alter_id: blob.aid.trim().parse().unwrap_or(0),
        cipher: blob.scy.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "auto".to_string()),
        udp: false,
        tls,
        servername: blob.sni.clone().and_then(opt),
        network: network.clone(),
        ws_opts: None,
        grpc_opts: None,
        alpn: blob
            .alpn
            .as_deref()
            .map(|a| a.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
        skip_cert_verify: false,
        client_fingerprint: blob.fp.clone().and_then(opt),
    };

    match network.as_deref() {
        Some("ws") | Some("http") => {
            config.ws_opts = WsOptions::from_parts(
                blob.path.clone().and_then(opt),
                blob.host.clone().and_then(opt),
            );
        }
        Some("grpc") => {
            if let Some(service) = blob.path.clone().and_then(opt) {
                config.grpc_opts = Some(GrpcOptions { service_name: Some(service) });
            }
        }
        _ => {}
    }

    Ok(NamedProxy::new(blob.ps, ProxyConfig::Vmess(config)))
}

fn de_stringy<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Int(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_numeric_port_and_aid() {
        let json = r#"{"v":"2","ps":"东京01","add":"v.example.com","port":8443,"id":"uuid-1","aid":0,"net":"ws","host":"cdn.example.com","path":"/ray","tls":"tls"}"#;
        let link = format!("vmess://{}", b64_encode(json));
        let named = decode(&link).unwrap();
        assert_eq!(named.name, "东京01");
        match named.config {
            ProxyConfig::Vmess(v) => {
                assert_eq!(v.port, 8443);
                assert!(v.tls);
                assert_eq!(v.ws_opts.as_ref().and_then(|w| w.host()), Some("cdn.example.com"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn roundtrip_preserves_transport_and_tls() {
        let cfg = VmessConfig {
            server: "v.example.com".into(),
            port: 443,
            uuid: "a3f1c2d4-e5b6-4789-9abc-def012345678".into(),
            cipher: "auto".into(),
            tls: true,
            servername: Some("cdn.example.com".into()),
            network: Some("grpc".into()),
            grpc_opts: Some(GrpcOptions { service_name: Some("mygrpc".into()) }),
            ..Default::default()
        };
        let link = encode("日本 gRPC", &cfg).unwrap();
        let named = decode(&link).unwrap();
        assert_eq!(named.name, "日本 gRPC");
        match named.config {
            ProxyConfig::Vmess(v) => {
                assert_eq!(v.server, cfg.server);
                assert_eq!(v.grpc_opts, cfg.grpc_opts);
                assert_eq!(v.servername, cfg.servername);
                assert_eq!(v.client_fingerprint.as_deref(), Some("chrome"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn missing_uuid_fails_encode() {
        let cfg = VmessConfig { server: "v.example.com".into(), port: 443, ..Default::default() };
        assert!(matches!(encode("x", &cfg), Err(LinkError::MissingField("uuid"))));
    }
}
