//! ss 链接。
//!
//! 标准形：`ss://base64(cipher:password)@host:port?plugin=...#name`，
//! 同时兼容整段 base64 的旧写法 `ss://base64(cipher:password@host:port)#name`。

use std::collections::BTreeMap;

use crate::error::LinkError;
use crate::link::util::{
    b64_decode_str, b64_encode, finish_link, format_host, pct_decode, pct_encode, split_host_port,
};
use crate::model::proxy::{NamedProxy, ProxyConfig, ShadowsocksConfig};

pub fn encode(name: &str, c: &ShadowsocksConfig) -> Result<String, LinkError> {
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

    let userinfo = b64_encode(format!("{}:{}", c.cipher, c.password));
    let mut base = format!("ss://{}@{}:{}", userinfo, format_host(&c.server), c.port);

    if let Some(plugin) = c.plugin.as_deref().filter(|p| !p.is_empty()) {
        let mut plugin_str = plugin.to_string();
        if let Some(opts) = &c.plugin_opts {
            for (k, v) in opts {
                plugin_str.push(';');
                plugin_str.push_str(&format!("{k}={v}"));
            }
        }
        base.push_str("?plugin=");
        base.push_str(&pct_encode(&plugin_str));
    }

    Ok(finish_link(base, String::new(), name))
}

pub fn decode(link: &str) -> Result<NamedProxy, LinkError> {
    let rest = link.strip_prefix("ss://").ok_or(LinkError::SchemeMismatch("ss"))?;

    let (body, name) = match rest.split_once('#') {
        Some((b, frag)) => (b, pct_decode(frag)),
        None => (rest, String::new()),
    };
    let (body, plugin_raw) = match body.split_once('?') {
        Some((b, q)) => {
            let plugin = q
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(k, _)| *k == "plugin")
                .map(|(_, v)| pct_decode(v));
            (b, plugin)
        }
        None => (body, None),
    };

    let (userinfo, hostport) = match body.rsplit_once('@') {
        // 标准形：userinfo 单独 base64
        Some((ui, hp)) => (b64_decode_str(&pct_decode(ui))?, hp.to_string()),
        // 旧写法：整段 base64 后再拆
        None => {
            let decoded = b64_decode_str(body)?;
            let (ui, hp) = decoded
                .rsplit_once('@')
                .ok_or(LinkError::Malformed("缺少服务器地址部分"))?;
            (ui.to_string(), hp.to_string())
        }
    };

    let (cipher, password) =
        userinfo.split_once(':').ok_or(LinkError::Malformed("缺少加密方式"))?;
    let (server, port) = split_host_port(&hostport)?;

    let (plugin, plugin_opts) = match plugin_raw.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => {
            let mut iter = raw.split(';');
            let plugin = iter.next().unwrap_or_default().to_string();
            let mut opts = BTreeMap::new();
            for item in iter {
                if item.is_empty() {
                    continue;
                }
                match item.split_once('=') {
                    Some((k, v)) => opts.insert(k.to_string(), v.to_string()),
                    None => opts.insert(item.to_string(), "true".to_string()),
                };
            }
            (Some(plugin), if opts.is_empty() { None } else { Some(opts) })
        }
        None => (None, None),
    };

    let config = ShadowsocksConfig {
        server,
        port,
        cipher: cipher.to_string(),
        password: password.to_string(),
        udp: false,
        plugin,
        plugin_opts,
    };
    Ok(NamedProxy::new(name, ProxyConfig::Shadowsocks(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_plugin() {
        let mut opts = BTreeMap::new();
        opts.insert("obfs".to_string(), "http".to_string());
        opts.insert("obfs-host".to_string(), "bing.com".to_string());
        let cfg = ShadowsocksConfig {
            server: "ss.example.com".into(),
            port: 8388,
            cipher: "chacha20-ietf-poly1305".into(),
            password: "pass:word".into(),
            plugin: Some("obfs-local".into()),
            plugin_opts: Some(opts),
            ..Default::default()
        };
        let link = encode("新加坡-SS", &cfg).unwrap();
        let named = decode(&link).unwrap();
        assert_eq!(named.name, "新加坡-SS");
        assert_eq!(named.config, ProxyConfig::Shadowsocks(cfg));
    }

    #[test]
    fn legacy_whole_base64_form() {
        let blob = b64_encode("aes-256-gcm:secret@legacy.example.com:443");
        let link = format!("ss://{blob}#旧格式");
        let named = decode(&link).unwrap();
        match named.config {
            ProxyConfig::Shadowsocks(s) => {
                assert_eq!(s.cipher, "aes-256-gcm");
                assert_eq!(s.password, "secret");
                assert_eq!(s.server, "legacy.example.com");
                assert_eq!(s.port, 443);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn userinfo_without_colon_is_malformed() {
        let link = format!("ss://{}@h.example.com:443", b64_encode("cipheronly"));
        assert!(matches!(decode(&link), Err(LinkError::Malformed(_))));
    }
}
