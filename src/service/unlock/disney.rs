use async_trait::async_trait;
use reqwest::Client;

use crate::model::UnlockResult;
use crate::service::unlock::{StreamProbe, UA_BROWSER};

/// Disney+ 地区检测。
pub struct DisneyPlus;

#[async_trait]
impl StreamProbe for DisneyPlus {
    fn platform(&self) -> &'static str {
        "Disney+"
    }

    async fn probe(&self, client: &Client) -> UnlockResult {
        let platform = self.platform();

        let resp = match client
            .get("https://www.disneyplus.com")
            .header("User-Agent", UA_BROWSER)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return UnlockResult::failed_with(platform, "Network Connection Error"),
        };

        // 重定向落点先行判定
        let location = resp.url().to_string();
        if location.contains("/unavailable") {
            return UnlockResult::failed_with(platform, "Not Available");
        }
        if location.contains("/blocked") {
            return UnlockResult::failed_with(platform, "Blocked");
        }

        let html = match resp.text().await {
            Ok(t) => t,
            Err(_) => return UnlockResult::failed_with(platform, "Read Response Error"),
        };

        if html.contains("not available in your region")
            || html.contains("Disney+ is not available in your country")
        {
            return UnlockResult::failed_with(platform, "Region Restricted");
        }

        if html.contains("subscription")
            || html.contains("hero-collection")
            || html.contains("sign-up")
        {
            if let Some(region) = extract_region(&html) {
                return UnlockResult::success(platform, region);
            }
            return UnlockResult::success(platform, "Available");
        }

        UnlockResult::failed_with(platform, "Not Available")
    }
}

fn extract_region(html: &str) -> Option<&str> {
    let (_, tail) = html.split_once("\"region\":\"")?;
    let (region, _) = tail.split_once('"')?;
    (!region.is_empty()).then_some(region)
}
