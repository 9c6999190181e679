#![allow(dead_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// 节点配置，按 `type` 标签区分协议族。
///
/// 订阅解析阶段即完成类型化，后续所有流程只接触强类型配置，
/// 不再传递原始字典。字段名与 Clash 配置保持一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProxyConfig {
    #[serde(rename = "vmess")]
    Vmess(VmessConfig),
    #[serde(rename = "vless")]
    Vless(VlessConfig),
    #[serde(rename = "trojan")]
    Trojan(TrojanConfig),
    #[serde(rename = "ss", alias = "shadowsocks")]
    Shadowsocks(ShadowsocksConfig),
    #[serde(rename = "ssr", alias = "shadowsocksr")]
    ShadowsocksR(SsrConfig),
    #[serde(rename = "hysteria2", alias = "hy2")]
    Hysteria2(Hysteria2Config),
    #[serde(rename = "tuic")]
    Tuic(TuicConfig),
}

impl ProxyConfig {
    /// 协议族标识，与 Clash `type` 字段取值一致。
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyConfig::Vmess(_) => "vmess",
            ProxyConfig::Vless(_) => "vless",
            ProxyConfig::Trojan(_) => "trojan",
            ProxyConfig::Shadowsocks(_) => "ss",
            ProxyConfig::ShadowsocksR(_) => "ssr",
            ProxyConfig::Hysteria2(_) => "hysteria2",
            ProxyConfig::Tuic(_) => "tuic",
        }
    }

    pub fn server(&self) -> &str {
        match self {
            ProxyConfig::Vmess(c) => &c.server,
            ProxyConfig::Vless(c) => &c.server,
            ProxyConfig::Trojan(c) => &c.server,
            ProxyConfig::Shadowsocks(c) => &c.server,
            ProxyConfig::ShadowsocksR(c) => &c.server,
            ProxyConfig::Hysteria2(c) => &c.server,
            ProxyConfig::Tuic(c) => &c.server,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            ProxyConfig::Vmess(c) => c.port,
            ProxyConfig::Vless(c) => c.port,
            ProxyConfig::Trojan(c) => c.port,
            ProxyConfig::Shadowsocks(c) => c.port,
            ProxyConfig::ShadowsocksR(c) => c.port,
            ProxyConfig::Hysteria2(c) => c.port,
            ProxyConfig::Tuic(c) => c.port,
        }
    }

    /// 判断 `type` 字段是否属于受支持的协议族（含别名写法）。
    pub fn is_supported_kind(kind: &str) -> bool {
        matches!(
            kind,
            "vmess" | "vless" | "trojan" | "ss" | "shadowsocks" | "ssr" | "shadowsocksr"
                | "hysteria2" | "hy2" | "tuic"
        )
    }

    /// 全字段等价的规范化指纹（不含名称），用于去重。
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// 带名称的节点。名称只做展示与去重标识，不参与配置等价比较。
#[derive(Debug, Clone, PartialEq)]
pub struct NamedProxy {
    pub name: String,
    pub config: ProxyConfig,
}

impl NamedProxy {
    pub fn new(name: impl Into<String>, config: ProxyConfig) -> Self {
        Self { name: name.into(), config }
    }

    /// 名称为空时的兜底显示标识。
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.config.server(), self.config.port())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct VmessConfig {
    /// 服务器地址（域名或 IP，IPv6 不带方括号）。
    pub server: String,

    /// 服务器端口，兼容数字与字符串两种写法。
    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    /// 用户标识。
    pub uuid: String,

    /// 额外 ID，旧版协议遗留字段，默认 0。
    #[serde(rename = "alterId", alias = "alter-id", default, deserialize_with = "de_flex_u32")]
    pub alter_id: u32,

    /// 加密方式，默认 `auto`。
    #[serde(default = "default_cipher_auto")]
    pub cipher: String,

    #[serde(default)]
    pub udp: bool,

    #[serde(default)]
    pub tls: bool,

    /// TLS SNI。
    #[serde(default, alias = "sni")]
    pub servername: Option<String>,

    /// 传输层协议（tcp/ws/grpc），缺省按 tcp 处理。
    #[serde(default)]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    #[serde(default)]
    pub skip_cert_verify: bool,

    /// TLS 指纹伪装，开启 TLS 时编码端默认 `chrome`。
    #[serde(default)]
    pub client_fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct VlessConfig {
    pub server: String,

    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    pub uuid: String,

    /// 流控模式（如 `xtls-rprx-vision`）。
    #[serde(default)]
    pub flow: Option<String>,

    #[serde(default)]
    pub udp: bool,

    #[serde(default)]
    pub tls: bool,

    #[serde(default, alias = "sni")]
    pub servername: Option<String>,

    #[serde(default)]
    pub network: Option<String>,

    /// Reality 握手参数，存在时优先于普通 TLS。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    #[serde(default)]
    pub skip_cert_verify: bool,

    #[serde(default)]
    pub client_fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TrojanConfig {
    pub server: String,

    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    pub password: String,

    #[serde(default, alias = "servername")]
    pub sni: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    #[serde(default)]
    pub skip_cert_verify: bool,

    #[serde(default)]
    pub udp: bool,

    #[serde(default)]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ShadowsocksConfig {
    pub server: String,

    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    pub cipher: String,

    pub password: String,

    #[serde(default)]
    pub udp: bool,

    /// 混淆插件名（如 `obfs`、`v2ray-plugin`）。
    #[serde(default)]
    pub plugin: Option<String>,

    /// 插件参数表，序列化为有序映射保证指纹稳定。
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string_map")]
    pub plugin_opts: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct SsrConfig {
    pub server: String,

    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    pub cipher: String,

    pub password: String,

    #[serde(default = "default_protocol_origin")]
    pub protocol: String,

    #[serde(default = "default_obfs_plain")]
    pub obfs: String,

    #[serde(default)]
    pub obfs_param: Option<String>,

    #[serde(default)]
    pub protocol_param: Option<String>,

    /// 机场分组标识，仅透传。
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub udp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Hysteria2Config {
    pub server: String,

    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    pub password: String,

    /// 端口跳跃范围（如 `30000-40000`）。
    #[serde(default, alias = "mport", deserialize_with = "de_opt_stringy")]
    pub ports: Option<String>,

    #[serde(default)]
    pub obfs: Option<String>,

    #[serde(default)]
    pub obfs_password: Option<String>,

    #[serde(default, alias = "servername")]
    pub sni: Option<String>,

    #[serde(default)]
    pub skip_cert_verify: bool,

    /// 上行带宽声明，兼容 `100` 与 `"100 Mbps"` 两种写法。
    #[serde(default, deserialize_with = "de_opt_stringy")]
    pub up: Option<String>,

    #[serde(default, deserialize_with = "de_opt_stringy")]
    pub down: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TuicConfig {
    pub server: String,

    #[serde(deserialize_with = "de_port")]
    pub port: u16,

    #[serde(default)]
    pub uuid: String,

    pub password: String,

    #[serde(default, alias = "servername")]
    pub sni: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    #[serde(default)]
    pub skip_cert_verify: bool,

    #[serde(default)]
    pub udp_relay_mode: Option<String>,

    #[serde(default)]
    pub congestion_controller: Option<String>,

    #[serde(default)]
    pub client_fingerprint: Option<String>,
}

/// WebSocket 传输参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl WsOptions {
    pub fn host(&self) -> Option<&str> {
        let headers = self.headers.as_ref()?;
        headers.get("Host").or_else(|| headers.get("host")).map(String::as_str)
    }

    pub fn from_parts(path: Option<String>, host: Option<String>) -> Option<Self> {
        if path.is_none() && host.is_none() {
            return None;
        }
        let headers = host.map(|h| {
            let mut m = BTreeMap::new();
            m.insert("Host".to_string(), h);
            m
        });
        Some(WsOptions { path, headers })
    }
}

/// gRPC 传输参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GrpcOptions {
    #[serde(rename = "grpc-service-name", alias = "serviceName", default)]
    pub service_name: Option<String>,
}

/// Reality 握手参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RealityOptions {
    #[serde(rename = "public-key", default)]
    pub public_key: String,

    #[serde(rename = "short-id", default)]
    pub short_id: String,
}

fn default_cipher_auto() -> String {
    "auto".to_string()
}

fn default_protocol_origin() -> String {
    "origin".to_string()
}

fn default_obfs_plain() -> String {
    "plain".to_string()
}

/// 端口字段兼容数字与字符串两种写法。
pub(crate) fn de_port<'de, D>(d: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u16),
        Text(String),
    }
    match Raw::deserialize(d)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_flex_u32<'de, D>(d: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }
    match Raw::deserialize(d)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_opt_stringy<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Bool(bool),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(d)? {
        None => None,
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
        Some(Raw::Bool(b)) => Some(b.to_string()),
        Some(Raw::Text(s)) => Some(s),
    })
}

fn de_opt_string_map<'de, D>(d: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawVal {
        Int(i64),
        Float(f64),
        Bool(bool),
        Text(String),
    }
    let raw = Option::<BTreeMap<String, RawVal>>::deserialize(d)?;
    Ok(raw.map(|m| {
        m.into_iter()
            .map(|(k, v)| {
                let v = match v {
                    RawVal::Int(n) => n.to_string(),
                    RawVal::Float(f) => f.to_string(),
                    RawVal::Bool(b) => b.to_string(),
                    RawVal::Text(s) => s,
                };
                (k, v)
            })
            .collect()
    }))
}
