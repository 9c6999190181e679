use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::UnlockResult;
use crate::service::unlock::{StreamProbe, UA_BROWSER};

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    country: String,
}

/// Spotify 可用性检测，按账号接口的状态码分类。
pub struct Spotify;

#[async_trait]
impl StreamProbe for Spotify {
    fn platform(&self) -> &'static str {
        "Spotify"
    }

    async fn probe(&self, client: &Client) -> UnlockResult {
        let platform = self.platform();

        let resp = match client
            .get("https://api.spotify.com/v1/me")
            .header("User-Agent", UA_BROWSER)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return UnlockResult::failed_with(platform, "Network Connection Error"),
        };

        match resp.status().as_u16() {
            200 => {
                let body = match resp.text().await {
                    Ok(t) => t,
                    Err(_) => return UnlockResult::failed_with(platform, "Read Response Error"),
                };
                let me: MeResponse = match serde_json::from_str(&body) {
                    Ok(v) => v,
                    Err(_) => return UnlockResult::failed_with(platform, "Parse Error"),
                };
                if me.country.is_empty() {
                    UnlockResult::success(platform, "Available")
                } else {
                    UnlockResult::success(platform, me.country)
                }
            }
            401 => UnlockResult::failed_with(platform, "Login Required"),
            403 => UnlockResult::failed_with(platform, "Region Restricted"),
            404 => UnlockResult::failed_with(platform, "Not Available"),
            _ => UnlockResult::failed_with(platform, "Unknown Error"),
        }
    }
}
