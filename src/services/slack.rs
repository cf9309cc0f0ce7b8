//! Slack message composition and webhook delivery.
//!
//! `build_message` is pure; `SlackClient` performs the single POST.

use serde::Serialize;
use std::time::Duration;

use crate::errors::AppError;
use crate::helpers::format_display_time;
use crate::services::build_http_client;
use crate::services::forecast::ForecastRecord;

/// Notification fallback text shown by clients that cannot render blocks.
const FALLBACK_TEXT: &str = "New avalanche forecast";

/// Slack Block Kit text object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

/// Slack Block Kit layout block (only the kinds the message uses).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },
}

/// Webhook payload for one forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    pub blocks: Vec<Block>,
}

fn mrkdwn(text: String) -> TextObject {
    TextObject::Mrkdwn { text }
}

fn section_text(text: String) -> Block {
    Block::Section {
        text: Some(mrkdwn(text)),
        fields: Vec::new(),
    }
}

fn section_fields(fields: Vec<TextObject>) -> Block {
    Block::Section { text: None, fields }
}

/// Render a forecast into a Slack message.
pub fn build_message(
    record: &ForecastRecord,
    header: &str,
    full_forecast_url: &str,
) -> OutboundMessage {
    let danger = record.max_current_danger();

    OutboundMessage {
        text: FALLBACK_TEXT.to_string(),
        blocks: vec![
            Block::Header {
                text: TextObject::PlainText {
                    text: header.to_string(),
                },
            },
            section_fields(vec![
                mrkdwn(format!(
                    "*Published:*\n{}",
                    format_display_time(record.published_at())
                )),
                mrkdwn(format!(
                    "*Expires:*\n{}",
                    format_display_time(record.expires_at())
                )),
            ]),
            section_fields(vec![mrkdwn(format!("*Author:*\n{}", record.author()))]),
            section_text(format!(
                "*Overall danger:*\n:avy-danger-{label}: {label} ({index}/5)",
                label = danger.label(),
                index = danger.index()
            )),
            section_text(format!("*Bottom line:*\n{}", record.bottom_line())),
            section_text(format!("<{}|Read full forecast>", full_forecast_url)),
        ],
    }
}

/// Client for an incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackClient {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            webhook_url: webhook_url.to_string(),
        })
    }

    /// POST the message once. Any transport error, timeout or non-2xx is a `Notify` error.
    pub async fn post_message(&self, message: &OutboundMessage) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Notify(format!(
                "webhook returned HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
