//! # 节点加载模块
//!
//! ## 支持的来源
//! - Clash YAML 文档（顶层 `proxies:` 序列）
//! - 分享链接清单（每行一条）
//! - 整段 base64 的订阅内容
//!
//! 来源可以是本地路径或 http(s) 地址，多个来源合并加载。
//!
//! ## 去重规则
//! - 配置全字段相同（忽略名称）：静默丢弃，保留先到者
//! - 同一来源内重名：视为配置错误中断
//! - 跨来源重名：保留先到者

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::link;
use crate::link::util::b64_decode_str;
use crate::model::app_config::FilterConfig;
use crate::model::proxy::{NamedProxy, ProxyConfig};

#[derive(Debug, Deserialize)]
struct RawClashConfig {
    #[serde(default)]
    proxies: Vec<Value>,
}

/// 读取全部来源并合并为一份节点清单。
pub async fn load_all(
    sources: &[String],
    filter: &FilterConfig,
) -> Result<Vec<NamedProxy>, AppError> {
    let mut batches = Vec::with_capacity(sources.len());
    for source in sources {
        let text = fetch_source(source).await?;
        let proxies = parse_document(&text)?;
        info!("📄 {} 读入 {} 个节点", source, proxies.len());
        batches.push(proxies);
    }
    merge_sources(batches, &filter.name_regex)
}

async fn fetch_source(source: &str) -> Result<String, AppError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("📡 拉取远程订阅: {}", source);
        let resp = reqwest::get(source).await?;
        Ok(resp.text().await?)
    } else {
        Ok(tokio::fs::read_to_string(source).await?)
    }
}

/// 识别并解析一份订阅文本。
pub(crate) fn parse_document(text: &str) -> Result<Vec<NamedProxy>, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if has_link_lines(trimmed) {
        return Ok(parse_links(trimmed));
    }

    match serde_yaml::from_str::<RawClashConfig>(text) {
        Ok(raw) if !raw.proxies.is_empty() => return parse_clash(raw),
        Ok(_) => {}
        // 形似 Clash 文档但 YAML 损坏，直接暴露解析错误
        Err(e) if looks_like_clash(trimmed) => return Err(AppError::YamlError(e)),
        Err(_) => {}
    }

    if let Ok(decoded) = b64_decode_str(trimmed) {
        if has_link_lines(&decoded) {
            return Ok(parse_links(&decoded));
        }
    }

    Err(AppError::ConfigError("无法识别的订阅内容".to_string()))
}

fn has_link_lines(text: &str) -> bool {
    text.lines().any(|l| link::looks_like_link(l))
}

fn looks_like_clash(text: &str) -> bool {
    text.lines().any(|l| l.trim_start().starts_with("proxies:"))
}

fn parse_links(text: &str) -> Vec<NamedProxy> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || !link::looks_like_link(line) {
            continue;
        }
        match link::decode(line) {
            Ok(p) => out.push(p),
            Err(e) => {
                let head: String = line.chars().take(48).collect();
                warn!("⚠️ 跳过无法解析的链接: {}... ({})", head, e);
            }
        }
    }
    out
}

fn parse_clash(raw: RawClashConfig) -> Result<Vec<NamedProxy>, AppError> {
    let mut out = Vec::new();
    for (idx, entry) in raw.proxies.into_iter().enumerate() {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::ConfigError(format!("第 {} 个节点缺少 name 字段", idx + 1))
            })?;
        let kind = entry.get("type").and_then(Value::as_str).unwrap_or("");
        if !ProxyConfig::is_supported_kind(kind) {
            debug!("跳过不支持的协议类型: {} ({})", name, kind);
            continue;
        }
        // 已知无效组合：ss 配 "ss" 加密
        if (kind == "ss" || kind == "shadowsocks")
            && entry.get("cipher").and_then(Value::as_str) == Some("ss")
        {
            debug!("跳过无效节点: {}", name);
            continue;
        }
        let config: ProxyConfig = serde_yaml::from_value(entry)
            .map_err(|e| AppError::ConfigError(format!("节点 {name} 解析失败: {e}")))?;
        out.push(NamedProxy::new(name, config));
    }
    Ok(out)
}

/// 合并多来源清单，应用去重与名称过滤。
pub(crate) fn merge_sources(
    batches: Vec<Vec<NamedProxy>>,
    name_regex: &str,
) -> Result<Vec<NamedProxy>, AppError> {
    let name_re = Regex::new(name_regex)
        .map_err(|e| AppError::ConfigError(format!("无效的名称正则 {name_regex}: {e}")))?;

    let mut merged: Vec<NamedProxy> = Vec::new();
    let mut global_names: HashSet<String> = HashSet::new();
    let mut fingerprints: HashSet<String> = HashSet::new();

    for batch in batches {
        let mut local_names: HashSet<String> = HashSet::new();
        for proxy in batch {
            let fp = proxy.config.fingerprint();
            if fingerprints.contains(&fp) {
                debug!("配置完全相同，忽略重复节点: {}", proxy.name);
                continue;
            }
            if !local_names.insert(proxy.name.clone()) {
                return Err(AppError::DuplicateName(proxy.name));
            }
            if global_names.contains(&proxy.name) {
                debug!("名称已在先前来源出现，保留先到者: {}", proxy.name);
                continue;
            }
            global_names.insert(proxy.name.clone());
            fingerprints.insert(fp);
            merged.push(proxy);
        }
    }

    let before = merged.len();
    merged.retain(|p| name_re.is_match(&p.name));
    if merged.len() < before {
        info!("🔎 名称过滤: {} -> {} 个节点", before, merged.len());
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::util::b64_encode;

    const CLASH_DOC: &str = r#"
proxies:
  - name: 香港 A
    type: trojan
    server: a.example.com
    port: 443
    password: pw-a
    sni: a.example.com
  - name: 日本 B
    type: vmess
    server: b.example.com
    port: "8443"
    uuid: 52c3597e-82e8-4c6e-b175-5ba6a3a92b03
    alterId: 0
  - name: 直连 C
    type: socks5
    server: c.example.com
    port: 1080
"#;

    #[test]
    fn clash_yaml_parses_supported_types_only() {
        let proxies = parse_document(CLASH_DOC).unwrap();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0].name, "香港 A");
        assert_eq!(proxies[0].config.kind(), "trojan");
        assert_eq!(proxies[1].config.port(), 8443);
    }

    #[test]
    fn ss_with_ss_cipher_is_dropped() {
        let doc = r#"
proxies:
  - name: bogus
    type: ss
    server: s.example.com
    port: 8388
    cipher: ss
    password: pw
  - name: ok
    type: ss
    server: s.example.com
    port: 8389
    cipher: aes-256-gcm
    password: pw
"#;
        let proxies = parse_document(doc).unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].name, "ok");
    }

    #[test]
    fn broken_supported_entry_is_fatal() {
        let doc = "proxies:\n  - name: bad\n    type: vmess\n    port: 443\n";
        assert!(matches!(parse_document(doc), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn missing_name_is_fatal() {
        let doc = "proxies:\n  - type: trojan\n    server: a.com\n    port: 443\n    password: p\n";
        assert!(matches!(parse_document(doc), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn link_list_skips_undecodable_lines() {
        let doc = "trojan://pw@t.example.com:443#正常\nvmess://!!!not-base64!!!\n";
        let proxies = parse_document(doc).unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].name, "正常");
    }

    #[test]
    fn base64_subscription_unwraps_to_links() {
        let inner = "trojan://pw@t.example.com:443#订阅节点\nhy2://pw2@h.example.com:8443#另一条\n";
        let doc = b64_encode(inner);
        let proxies = parse_document(&doc).unwrap();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[1].config.kind(), "hysteria2");
    }

    #[test]
    fn unrecognized_document_is_config_error() {
        assert!(matches!(
            parse_document("<html>not a subscription</html>"),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn corrupt_clash_yaml_surfaces_parse_error() {
        // YAML 禁止制表符缩进，必然触发解析错误
        let doc = "proxies:\n\t- name: 甲\n";
        assert!(matches!(parse_document(doc), Err(AppError::YamlError(_))));
    }

    fn trojan_named(name: &str, server: &str) -> NamedProxy {
        let doc = format!(
            "proxies:\n  - name: {name}\n    type: trojan\n    server: {server}\n    port: 443\n    password: pw\n"
        );
        parse_document(&doc).unwrap().remove(0)
    }

    #[test]
    fn same_config_different_name_is_deduped() {
        let batches = vec![vec![trojan_named("甲", "x.com"), trojan_named("乙", "x.com")]];
        let merged = merge_sources(batches, ".+").unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "甲");
    }

    #[test]
    fn duplicate_name_in_one_source_is_fatal() {
        let batches = vec![vec![trojan_named("同名", "x.com"), trojan_named("同名", "y.com")]];
        assert!(matches!(
            merge_sources(batches, ".+"),
            Err(AppError::DuplicateName(n)) if n == "同名"
        ));
    }

    #[test]
    fn duplicate_name_across_sources_keeps_first() {
        let batches = vec![
            vec![trojan_named("同名", "x.com")],
            vec![trojan_named("同名", "y.com")],
        ];
        let merged = merge_sources(batches, ".+").unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].config.server(), "x.com");
    }

    #[test]
    fn name_regex_filters_after_merge() {
        let batches = vec![vec![trojan_named("香港01", "x.com"), trojan_named("美国01", "y.com")]];
        let merged = merge_sources(batches, "香港").unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "香港01");
    }
}
