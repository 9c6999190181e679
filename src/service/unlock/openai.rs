use async_trait::async_trait;
use reqwest::Client;

use crate::model::UnlockResult;
use crate::service::unlock::{StreamProbe, UA_BROWSER};

const SEC_CH_UA: &str = r#""Chromium";v="120", "Not_A Brand";v="24", "Google Chrome";v="120""#;

/// ChatGPT 区域检测。
///
/// 结合两个端点判定：API 端返回 `unsupported_country` 表示地区不受支持，
/// iOS 端返回含 `vpn` 的拦截页表示出口被标记。
pub struct ChatGpt;

#[async_trait]
impl StreamProbe for ChatGpt {
    fn platform(&self) -> &'static str {
        "ChatGPT"
    }

    async fn probe(&self, client: &Client) -> UnlockResult {
        let platform = self.platform();

        let api_body = match fetch_api(client).await {
            Ok(b) => b,
            Err(info) => return UnlockResult::failed_with(platform, info),
        };
        let ios_body = match fetch_ios(client).await {
            Ok(b) => b,
            Err(info) => return UnlockResult::failed_with(platform, info),
        };

        let unsupported = api_body.to_lowercase().contains("unsupported_country");
        let vpn_blocked = ios_body.to_lowercase().contains("vpn");

        match (unsupported, vpn_blocked) {
            (false, false) => UnlockResult::success(platform, "Available"),
            (true, true) => UnlockResult::failed_with(platform, "Not Available"),
            (false, true) => UnlockResult::failed_with(platform, "Only Available with Web Browser"),
            (true, false) => UnlockResult::failed_with(platform, "Only Available with Mobile APP"),
        }
    }
}

async fn fetch_api(client: &Client) -> Result<String, &'static str> {
    let resp = client
        .get("https://api.openai.com/compliance/cookie_requirements")
        .header("User-Agent", UA_BROWSER)
        .header("Accept", "*/*")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Authorization", "Bearer null")
        .header("Content-Type", "application/json")
        .header("Origin", "https://platform.openai.com")
        .header("Referer", "https://platform.openai.com/")
        .header("Sec-Ch-Ua", SEC_CH_UA)
        .header("Sec-Ch-Ua-Mobile", "?0")
        .header("Sec-Ch-Ua-Platform", "Windows")
        .header("Sec-Fetch-Dest", "empty")
        .header("Sec-Fetch-Mode", "cors")
        .header("Sec-Fetch-Site", "same-site")
        .send()
        .await
        .map_err(|_| "Network Connection Error")?;
    resp.text().await.map_err(|_| "Read Response Error")
}

async fn fetch_ios(client: &Client) -> Result<String, &'static str> {
    let resp = client
        .get("https://ios.chat.openai.com/")
        .header("User-Agent", UA_BROWSER)
        .header("Accept", "*/*;q=0.8,application/signed-exchange;v=b3;q=0.7")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Sec-Ch-Ua", SEC_CH_UA)
        .header("Sec-Ch-Ua-Mobile", "?0")
        .header("Sec-Ch-Ua-Platform", "Windows")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header("Sec-Fetch-User", "?1")
        .header("Upgrade-Insecure-Requests", "1")
        .send()
        .await
        .map_err(|_| "Network Connection Error")?;
    resp.text().await.map_err(|_| "Read Response Error")
}
