// src/services/notifier.rs
//! Outbound Telegram Bot API notifier.
//!
//! Sends the single message this service ever needs to send: a chat reply
//! with an inline-keyboard button that opens the WebApp. One attempt, a
//! 10-second timeout, no retries; the caller decides whether a failure
//! matters.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;

/// Production Bot API endpoint.
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Outbound request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Thin client around the Bot API `sendMessage` call.
#[derive(Debug, Clone)]
pub struct BotNotifier {
    client: Client,
    api_base: String,
}

impl BotNotifier {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Builds a notifier against a custom API base (used by tests).
    pub fn with_api_base(api_base: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client must build from static configuration");
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Sends `text` to `chat_id` with one inline button opening the WebApp
    /// at `webapp_url`.
    ///
    /// # Errors
    /// Returns the transport error, or an error for a non-success Bot API
    /// status code. No retry is attempted either way.
    pub async fn send_webapp_button(
        &self,
        bot_token: &str,
        chat_id: i64,
        text: &str,
        webapp_url: &str,
    ) -> Result<(), reqwest::Error> {
        let send_url = format!("{}/bot{}/sendMessage", self.api_base, bot_token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": {
                "inline_keyboard": [[
                    {
                        "text": "Open WebApp",
                        "web_app": {"url": webapp_url}
                    }
                ]]
            }
        });

        self.client
            .post(&send_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Default for BotNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{mock, Matcher};

    #[tokio::test]
    async fn test_send_posts_webapp_button_payload() {
        let endpoint = mock("POST", "/bot42:SEND/sendMessage")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": 7,
                "text": "hello",
                "reply_markup": {
                    "inline_keyboard": [[
                        {"text": "Open WebApp", "web_app": {"url": "http://127.0.0.1:8000/webapp"}}
                    ]]
                }
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create();

        let notifier = BotNotifier::with_api_base(&mockito::server_url());
        notifier
            .send_webapp_button("42:SEND", 7, "hello", "http://127.0.0.1:8000/webapp")
            .await
            .unwrap();
        endpoint.assert();
    }

    #[tokio::test]
    async fn test_send_surfaces_bot_api_errors() {
        let _endpoint = mock("POST", "/bot42:FAIL/sendMessage")
            .with_status(502)
            .create();

        let notifier = BotNotifier::with_api_base(&mockito::server_url());
        let result = notifier
            .send_webapp_button("42:FAIL", 7, "hello", "http://example.com")
            .await;
        assert!(result.is_err());
    }
}
