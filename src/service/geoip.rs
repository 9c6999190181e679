//! # 出口归属与纯净度模块
//!
//! 通过代理客户端访问 ipcheck.ing 获取落地 IP 的国家、地区信息，
//! 可选地再向 scamalytics 查询欺诈评分并换算为风险级别。
//!
//! 两个站点都挂在 Cloudflare 后面，请求时使用随机浏览器头，
//! 被拦截时换一套头重试。

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::debug;

use crate::model::IpInfo;

const GEO_URL: &str = "https://64.ipcheck.ing/geo";
const MAX_RETRIES: usize = 3;

const PC_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.2210.133 Safari/537.36",
];

const MOBILE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; SM-S918B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.6099.119 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 17_2_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; M2102J20SG) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36",
];

const LANGUAGES: &[&str] = &[
    "zh-CN,zh;q=0.9,en;q=0.8",
    "en-US,en;q=0.9",
    "zh-TW,zh;q=0.9,en;q=0.8",
    "ja-JP,ja;q=0.9,en;q=0.8",
    "ko-KR,ko;q=0.9,en;q=0.8",
    "en-GB,en;q=0.9",
];

/// 查询落地 IP 的地理信息，`with_risk` 为真时附带纯净度评分。
///
/// 风险值查询失败不视为错误，仅留空 `risk_info`。
pub async fn lookup(client: &Client, with_risk: bool) -> Result<IpInfo> {
    let body = get_with_retry(client, GEO_URL).await?;
    let mut info: IpInfo = serde_json::from_str(&body).context("地理位置响应解析失败")?;
    if info.country.is_empty() {
        bail!("地理位置响应缺少国家信息");
    }

    if with_risk && !info.ip.is_empty() {
        match fetch_risk(client, &info.ip).await {
            Ok(risk) => info.risk_info = risk,
            Err(e) => debug!("获取 IP 风险值失败: {}", e),
        }
    }
    Ok(info)
}

async fn fetch_risk(client: &Client, ip: &str) -> Result<String> {
    let url = format!("https://scamalytics.com/ip/{ip}");
    let html = get_with_retry(client, &url).await?;
    let score = parse_fraud_score(&html).ok_or_else(|| anyhow!("页面中未找到 Fraud Score"))?;
    Ok(format_risk(score))
}

async fn get_with_retry(client: &Client, url: &str) -> Result<String> {
    let mut last_err: Option<anyhow::Error> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(rand::random_range(100..1100))).await;
        }

        let mut req = client.get(url);
        for (name, value) in browser_headers() {
            req = req.header(name, value);
        }

        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                match resp.text().await {
                    Ok(body) => {
                        // Cloudflare 盾会回 403/503，换一套头再试
                        if (status == StatusCode::FORBIDDEN
                            || status == StatusCode::SERVICE_UNAVAILABLE)
                            && (body.contains("cloudflare") || body.contains("cf-"))
                        {
                            debug!("遇到 Cloudflare 验证 (尝试 {}/{})", attempt + 1, MAX_RETRIES);
                            last_err = Some(anyhow!("Cloudflare 验证拦截"));
                            continue;
                        }
                        return Ok(body);
                    }
                    Err(e) => last_err = Some(e.into()),
                }
            }
            Err(e) => {
                debug!("请求失败 (尝试 {}/{}): {}", attempt + 1, MAX_RETRIES, e);
                last_err = Some(e.into());
            }
        }
    }

    match last_err {
        Some(e) => Err(e.context(format!("达到最大重试次数 ({MAX_RETRIES})"))),
        None => Err(anyhow!("达到最大重试次数 ({MAX_RETRIES})")),
    }
}

/// 生成一套随机的浏览器请求头。
///
/// 不设置 accept-encoding，交给客户端按启用的压缩特性自行协商。
fn browser_headers() -> Vec<(&'static str, String)> {
    let is_mobile = rand::random::<f32>() < 0.3;
    let ua = if is_mobile {
        MOBILE_USER_AGENTS[rand::random_range(0..MOBILE_USER_AGENTS.len())]
    } else {
        PC_USER_AGENTS[rand::random_range(0..PC_USER_AGENTS.len())]
    };
    let lang = LANGUAGES[rand::random_range(0..LANGUAGES.len())];

    let mut headers: Vec<(&'static str, String)> = vec![
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"
                .to_string(),
        ),
        ("accept-language", lang.to_string()),
        ("cache-control", "no-cache".to_string()),
        ("pragma", "no-cache".to_string()),
        (
            "sec-ch-ua-mobile",
            if is_mobile { "?1" } else { "?0" }.to_string(),
        ),
        (
            "sec-ch-ua-platform",
            if is_mobile { "\"Android\"" } else { "\"Windows\"" }.to_string(),
        ),
        ("sec-fetch-dest", "document".to_string()),
        ("sec-fetch-mode", "navigate".to_string()),
        ("sec-fetch-site", "cross-site".to_string()),
        ("sec-fetch-user", "?1".to_string()),
        ("upgrade-insecure-requests", "1".to_string()),
        ("user-agent", ua.to_string()),
        (
            "cf-device-type",
            if is_mobile { "mobile" } else { "desktop" }.to_string(),
        ),
        ("cf-visitor", "{\"scheme\":\"https\"}".to_string()),
        ("x-forwarded-proto", "https".to_string()),
        ("x-requested-with", "XMLHttpRequest".to_string()),
        ("dnt", "1".to_string()),
    ];

    let sec_ch_ua = generate_sec_ch_ua(ua);
    if !sec_ch_ua.is_empty() {
        headers.push(("sec-ch-ua", sec_ch_ua));
    }
    let full_versions = generate_sec_ch_ua_versions(ua);
    if !full_versions.is_empty() {
        headers.push(("sec-ch-ua-full-version-list", full_versions));
    }

    headers
}

fn generate_sec_ch_ua(ua: &str) -> String {
    if ua.contains("Chrome") {
        let v = extract_version(ua, "Chrome");
        format!("\"Google Chrome\";v=\"{v}\", \"Not=A?Brand\";v=\"8\", \"Chromium\";v=\"{v}\"")
    } else if ua.contains("Firefox") {
        let v = extract_version(ua, "Firefox");
        format!("\"Firefox\";v=\"{v}\"")
    } else if ua.contains("Safari") {
        let v = extract_version(ua, "Version");
        format!("\"Safari\";v=\"{v}\"")
    } else {
        "\"Not=A?Brand\";v=\"8\"".to_string()
    }
}

fn generate_sec_ch_ua_versions(ua: &str) -> String {
    if ua.contains("Chrome") {
        let v = extract_version(ua, "Chrome");
        format!(
            "\"Google Chrome\";v=\"{v}.0.0.0\", \"Not=A?Brand\";v=\"8.0.0.0\", \"Chromium\";v=\"{v}.0.0.0\""
        )
    } else {
        String::new()
    }
}

fn extract_version(ua: &str, browser: &str) -> String {
    Regex::new(&format!(r"{browser}/(\d+)"))
        .ok()
        .and_then(|re| {
            re.captures(ua)
                .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
        })
        .unwrap_or_else(|| "0".to_string())
}

/// 从 scamalytics 页面里解析 Fraud Score。
pub(crate) fn parse_fraud_score(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("div.score").ok()?;
    for node in doc.select(&selector) {
        let text: String = node.text().collect();
        if text.contains("Fraud Score") {
            let tail = text.split(": ").nth(1)?.trim();
            let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
            return digits.parse().ok();
        }
    }
    None
}

pub(crate) fn format_risk(score: u32) -> String {
    let level = if score <= 33 {
        "纯净"
    } else if score <= 66 {
        "一般"
    } else {
        "较差"
    };
    format!("[{score}% {level}]")
}
