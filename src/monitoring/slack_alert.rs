//! Slack alert service for offline notifications
//!
//! Posts Block Kit messages through the `chat.postMessage` Web API method.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::SlackConfig;
use crate::monitoring::formatter::NotificationPayload;
use crate::monitoring::sink::NotificationSink;
use crate::utils::SinkError;

/// `chat.postMessage` request body
#[derive(Debug, Serialize)]
pub struct SlackMessage {
    /// Target channel name or ID
    pub channel: String,
    /// Fallback text for clients that cannot render blocks
    pub text: String,
    /// Block Kit layout
    pub blocks: Vec<SlackBlock>,
}

/// Subset of Block Kit blocks used by the monitor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlackBlock {
    Header {
        text: SlackText,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<SlackText>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<SlackText>>,
    },
}

/// Block Kit text object
#[derive(Debug, Clone, Serialize)]
pub struct SlackText {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl SlackText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "plain_text",
            text: text.into(),
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }
}

/// Web API envelope; HTTP 200 can still carry `ok: false`
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slack alert service
#[derive(Clone)]
pub struct SlackAlert {
    /// Web API base URL (no trailing slash)
    api_base: String,
    /// Bot token
    bot_token: String,
    /// Target channel
    channel: String,
    /// HTTP client
    client: Client,
}

impl SlackAlert {
    /// Create a new Slack alert service
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            channel: channel.into(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &SlackConfig) -> Self {
        Self::new(&config.api_base, &config.bot_token, &config.channel)
    }

    /// Target channel (for testing)
    pub fn channel(&self) -> &str {
        &self.channel
    }

    fn post_message_url(&self) -> String {
        format!("{}/chat.postMessage", self.api_base)
    }

    /// Render a payload as a Block Kit message: header, field section, comment section
    pub fn build_message(&self, payload: &NotificationPayload) -> SlackMessage {
        let fields = payload
            .fields
            .iter()
            .map(|f| format!("*{}:*\n{}", f.label, f.value))
            .map(SlackText::mrkdwn)
            .collect();

        SlackMessage {
            channel: self.channel.clone(),
            text: payload.header.clone(),
            blocks: vec![
                SlackBlock::Header {
                    text: SlackText::plain(payload.header.as_str()),
                },
                SlackBlock::Section {
                    text: None,
                    fields: Some(fields),
                },
                SlackBlock::Section {
                    text: Some(SlackText::mrkdwn(format!("*Comment:*\n{}", payload.body))),
                    fields: None,
                },
            ],
        }
    }

    async fn post(&self, message: &SlackMessage) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.post_message_url())
            .bearer_auth(&self.bot_token)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let api: SlackApiResponse = response.json().await?;
        if !api.ok {
            return Err(SinkError::Api(
                api.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for SlackAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackAlert")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for SlackAlert {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError> {
        let message = self.build_message(payload);
        debug!(channel = %self.channel, "Posting Slack message");
        self.post(&message).await?;
        info!(
            channel = %self.channel,
            game = payload.field("Game").unwrap_or("-"),
            "Notification sent to Slack"
        );
        Ok(())
    }
}
