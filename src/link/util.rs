#![allow(dead_code)]

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use crate::error::LinkError;

/// 标准字母表、带填充的 base64 编码。
pub fn b64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// URL 安全字母表、无填充的 base64 编码（SSR 系列使用）。
pub fn b64_encode_url(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// 宽松解码：两种字母表混用、缺失填充都可接受。
/// 订阅里的链接普遍不规范，解码端从宽，编码端保持规范输出。
pub fn b64_decode(s: &str) -> Result<Vec<u8>, LinkError> {
    let mut normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    Ok(STANDARD.decode(normalized)?)
}

pub fn b64_decode_str(s: &str) -> Result<String, LinkError> {
    let bytes = b64_decode(s)?;
    String::from_utf8(bytes).map_err(|_| LinkError::Malformed("base64 内容不是有效 UTF-8"))
}

/// 百分号解码，失败时原样保留。
pub fn pct_decode(s: &str) -> String {
    urlencoding::decode(s).map(|c| c.into_owned()).unwrap_or_else(|_| s.to_string())
}

pub fn pct_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// IPv6 地址写入 authority 时补方括号。
pub fn format_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

/// `userinfo@host:port?query#fragment` 形式链接的公共拆解结果。
pub struct LinkParts {
    pub userinfo: String,
    pub host: String,
    pub port: u16,
    pub query: HashMap<String, String>,
    pub name: String,
}

/// 拆解去掉协议前缀后的链接剩余部分。
/// userinfo 与 fragment 做百分号解码；缺少 `@` 时 userinfo 为空串，
/// 是否必填由各协议的编码端把关。
pub fn parse_userinfo_link(rest: &str) -> Result<LinkParts, LinkError> {
    let (body, name) = match rest.split_once('#') {
        Some((b, frag)) => (b, pct_decode(frag)),
        None => (rest, String::new()),
    };
    let (body, query) = match body.split_once('?') {
        Some((b, q)) => (b, parse_query(q)),
        None => (body, HashMap::new()),
    };
    let (userinfo, hostport) = match body.rsplit_once('@') {
        Some((u, hp)) => (pct_decode(u), hp),
        None => (String::new(), body),
    };
    let (host, port) = split_host_port(hostport)?;
    Ok(LinkParts { userinfo, host, port, query, name })
}

/// 从尾部拆端口，兼容带方括号的 IPv6 字面量。
pub fn split_host_port(hostport: &str) -> Result<(String, u16), LinkError> {
    let (host, port) = hostport
        .rsplit_once(':')
        .ok_or_else(|| LinkError::InvalidPort(hostport.to_string()))?;
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| LinkError::InvalidPort(hostport.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
    if host.is_empty() {
        return Err(LinkError::MissingField("server"));
    }
    Ok((host, port))
}

/// 查询串解析。`+` 在百分号解码前按空格处理，与通用实现行为一致。
pub fn parse_query(q: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in q.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        let v = v.replace('+', " ");
        map.insert(pct_decode(k), pct_decode(&v));
    }
    map
}

/// 按固定顺序构造查询串，空值跳过。
pub fn build_query(pairs: &[(&str, String)]) -> String {
    let mut parts = Vec::with_capacity(pairs.len());
    for (k, v) in pairs {
        if v.is_empty() {
            continue;
        }
        parts.push(format!("{}={}", k, pct_encode(v)));
    }
    parts.join("&")
}

/// 组装 `scheme://userinfo@host:port` 基础部分，必填项缺失时报错。
/// `secret_field` 是 userinfo 所承载字段的名称，用于报错提示。
pub fn build_base(
    scheme: &str,
    userinfo: &str,
    secret_field: &'static str,
    server: &str,
    port: u16,
) -> Result<String, LinkError> {
    if server.is_empty() {
        return Err(LinkError::MissingField("server"));
    }
    if port == 0 {
        return Err(LinkError::MissingField("port"));
    }
    if userinfo.is_empty() {
        return Err(LinkError::MissingField(secret_field));
    }
    Ok(format!("{}://{}@{}:{}", scheme, pct_encode(userinfo), format_host(server), port))
}

/// 查询串与名称拼回完整链接，查询为空时省略 `?`。
pub fn finish_link(mut base: String, query: String, name: &str) -> String {
    if !query.is_empty() {
        base.push('?');
        base.push_str(&query);
    }
    if !name.is_empty() {
        base.push('#');
        base.push_str(&pct_encode(name));
    }
    base
}

pub fn bool_flag(b: bool) -> String {
    if b { "1".to_string() } else { "0".to_string() }
}

pub fn is_truthy(v: Option<&String>) -> bool {
    matches!(v.map(String::as_str), Some("1") | Some("true"))
}

/// 非空字符串转 `Some`，供编码端过滤空字段。
pub fn opt(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_base64_accepts_both_alphabets() {
        let padded = b64_encode("chacha20:secret");
        let stripped = padded.trim_end_matches('=');
        assert_eq!(b64_decode_str(stripped).unwrap(), "chacha20:secret");
        assert_eq!(b64_decode_str(&b64_encode_url("a+b/c?")).unwrap(), "a+b/c?");
    }

    #[test]
    fn authority_splits_ipv6_and_userinfo() {
        let parts = parse_userinfo_link("p%40ss@[2001:db8::1]:8443?sni=a.com#%E8%8A%82%E7%82%B9").unwrap();
        assert_eq!(parts.userinfo, "p@ss");
        assert_eq!(parts.host, "2001:db8::1");
        assert_eq!(parts.port, 8443);
        assert_eq!(parts.query.get("sni").map(String::as_str), Some("a.com"));
        assert_eq!(parts.name, "节点");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            parse_userinfo_link("pw@host:70000"),
            Err(LinkError::InvalidPort(_))
        ));
        assert!(matches!(parse_userinfo_link("pw@host"), Err(LinkError::InvalidPort(_))));
    }

    #[test]
    fn query_builder_skips_empty_and_encodes() {
        let q = build_query(&[
            ("sni", "a.com".to_string()),
            ("alpn", "h3,h2".to_string()),
            ("obfs", String::new()),
        ]);
        assert_eq!(q, "sni=a.com&alpn=h3%2Ch2");
        let parsed = parse_query(&q);
        assert_eq!(parsed.get("alpn").map(String::as_str), Some("h3,h2"));
    }
}
