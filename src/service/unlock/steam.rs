use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;

use crate::model::UnlockResult;
use crate::service::unlock::{StreamProbe, UA_BROWSER};

/// 商店页里的货币特征，依次尝试。
static CURRENCY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""priceCurrency":"([^"]+)""#,
        r"data-price-final[^>]+>([A-Z]{2,3})\s",
        r"\$([A-Z]{2,3})\s+\d+\.\d+",
        r"¥\s*\d+",
        r"₩\s*\d+",
        r"NT\$\s*\d+",
        r"HK\$\s*\d+",
        r"S\$\s*\d+",
        r"A\$\s*\d+",
        r"₹\s*\d+",
        r"€\s*\d+",
        r"£\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Steam 商店货币区域检测。
pub struct Steam;

#[async_trait]
impl StreamProbe for Steam {
    fn platform(&self) -> &'static str {
        "Steam"
    }

    async fn probe(&self, client: &Client) -> UnlockResult {
        let platform = self.platform();

        let resp = match client
            .get("https://store.steampowered.com/app/761830")
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

        let html = match resp.text().await {
            Ok(t) => t,
            Err(_) => return UnlockResult::failed_with(platform, "Read Response Error"),
        };

        if let Some(currency) = detect_currency(&html) {
            return UnlockResult::success(platform, currency);
        }

        if html.contains("agecheck") || html.contains("age_check") {
            return UnlockResult::failed_with(platform, "Age Check Required");
        }
        if html.contains("maintenance") {
            return UnlockResult::failed_with(platform, "Store Maintenance");
        }

        UnlockResult::failed_with(platform, "Currency Not Found")
    }
}

pub(crate) fn detect_currency(html: &str) -> Option<String> {
    for re in CURRENCY_PATTERNS.iter() {
        let Some(caps) = re.captures(html) else {
            continue;
        };
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let currency = if whole.contains('¥') {
            "JPY".to_string()
        } else if whole.contains('₩') {
            "KRW".to_string()
        } else if whole.contains("NT$") {
            "TWD".to_string()
        } else if whole.contains("HK$") {
            "HKD".to_string()
        } else if whole.contains("S$") {
            "SGD".to_string()
        } else if whole.contains("A$") {
            "AUD".to_string()
        } else if whole.contains('₹') {
            "INR".to_string()
        } else if whole.contains('€') {
            "EUR".to_string()
        } else if whole.contains('£') {
            "GBP".to_string()
        } else if let Some(code) = caps.get(1) {
            code.as_str().to_string()
        } else {
            whole.to_string()
        };
        return Some(currency);
    }
    None
}
