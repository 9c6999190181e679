use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;

use crate::model::UnlockResult;
use crate::service::unlock::{StreamProbe, UA_BROWSER};

static COUNTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""countryCode":"([^"]+)""#).unwrap());

/// YouTube Premium 地区检测。
pub struct YouTube;

#[async_trait]
impl StreamProbe for YouTube {
    fn platform(&self) -> &'static str {
        "YouTube"
    }

    async fn probe(&self, client: &Client) -> UnlockResult {
        let platform = self.platform();

        let resp = match client
            .get("https://www.youtube.com/premium")
            .header("User-Agent", UA_BROWSER)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return UnlockResult::failed_with(platform, "Network Connection Error"),
        };

        let html = match resp.text().await {
            Ok(t) => t,
            Err(_) => return UnlockResult::failed_with(platform, "Read Response Error"),
        };

        if html.contains("Access to this page has been denied") {
            return UnlockResult::failed_with(platform, "Access Denied");
        }

        if let Some(caps) = COUNTRY_RE.captures(&html) {
            return UnlockResult::success(platform, &caps[1]);
        }

        if html.contains("Premium is not available") {
            UnlockResult::failed_with(platform, "Not Available")
        } else if html.contains("YouTube and YouTube Music ad-free") {
            UnlockResult::success(platform, "Available")
        } else {
            UnlockResult::failed_with(platform, "Unknown Error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_regex_extracts_region() {
        let html = r#"{"client":{"countryCode":"JP","gl":"JP"}}"#;
        let caps = COUNTRY_RE.captures(html).unwrap();
        assert_eq!(&caps[1], "JP");
    }
}
