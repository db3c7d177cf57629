use anyhow::Context;
use async_trait::async_trait;

use super::PushProvider;
use crate::models::PushMessage;

/// Multicast endpoint plus an Expo-style relay, both over HTTPS.
pub struct HttpPushProvider {
    multicast_url: String,
    multicast_key: String,
    relay_url: String,
    client: reqwest::Client,
}

impl HttpPushProvider {
    pub fn new(multicast_url: String, multicast_key: String, relay_url: String) -> Self {
        Self {
            multicast_url,
            multicast_key,
            relay_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushProvider for HttpPushProvider {
    async fn send_multicast(&self, tokens: &[String], message: &PushMessage) -> anyhow::Result<()> {
        anyhow::ensure!(!self.multicast_url.is_empty(), "PUSH_MULTICAST_URL is not set");

        let body = serde_json::json!({
            "tokens": tokens,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
        });

        self.client
            .post(&self.multicast_url)
            .bearer_auth(&self.multicast_key)
            .json(&body)
            .send()
            .await
            .context("failed to send multicast push")?
            .error_for_status()
            .context("multicast push endpoint returned error")?;

        Ok(())
    }

    async fn send_relay_batch(&self, tokens: &[String], message: &PushMessage) -> anyhow::Result<()> {
        let body: Vec<serde_json::Value> = tokens
            .iter()
            .map(|to| {
                serde_json::json!({
                    "to": to,
                    "title": message.title,
                    "body": message.body,
                    "data": message.data,
                    "sound": "default",
                })
            })
            .collect();

        self.client
            .post(&self.relay_url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("failed to send push relay batch")?
            .error_for_status()
            .context("push relay returned error")?;

        Ok(())
    }
}
