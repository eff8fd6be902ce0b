use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info};

use crate::config::TelegramConfig;
use crate::plugins::traits::Notifier;
use crate::scraper::absolutize;

const PARSE_MODE: &str = "HTML";

/// Sends messages through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
    site_root: String,
}

impl TelegramNotifier {
    /// `site_root` is used to resolve leading-slash image paths.
    pub fn new(config: &TelegramConfig, site_root: &str) -> Self {
        TelegramNotifier {
            client: Client::new(),
            config: config.clone(),
            site_root: site_root.trim_end_matches('/').to_string(),
        }
    }

    fn photo_url(&self, image_url: &str) -> String {
        if image_url.starts_with('/') {
            absolutize(&self.site_root, image_url).unwrap_or_else(|| image_url.to_string())
        } else {
            image_url.to_string()
        }
    }

    async fn post(&self, method: &str, form: &[(&str, &str)]) -> bool {
        let response = self
            .client
            .post(self.config.method_url(method))
            .form(form)
            .timeout(self.config.timeout())
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("✅ Telegram {} delivered", method);
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(
                    "❌ Telegram {} rejected ({}): {}",
                    method,
                    status,
                    error_description(&body)
                );
                false
            }
            Err(e) => {
                error!("❌ Telegram {} failed: {}", method, e);
                false
            }
        }
    }
}

/// The API's `description` field, or the raw body when it is not JSON.
fn error_description(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("description")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(&self, caption: &str) -> bool {
        self.post(
            "sendMessage",
            &[
                ("chat_id", self.config.chat_id.as_str()),
                ("text", caption),
                ("parse_mode", PARSE_MODE),
            ],
        )
        .await
    }

    async fn send_photo(&self, image_url: &str, caption: &str) -> bool {
        let photo = self.photo_url(image_url);
        self.post(
            "sendPhoto",
            &[
                ("chat_id", self.config.chat_id.as_str()),
                ("photo", photo.as_str()),
                ("caption", caption),
                ("parse_mode", PARSE_MODE),
            ],
        )
        .await
    }
}
