use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook answered with http status {status}")]
    HttpStatus { status: u16 },
    #[error("webhook rejected the message: errcode {errcode}: {errmsg}")]
    Rejected { errcode: i64, errmsg: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Posts text messages to a chat-group robot webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building webhook http client")?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    pub fn message_body(text: &str) -> JsonValue {
        json!({ "msgtype": "text", "text": { "content": text } })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::message_body(text))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::HttpStatus { status: status.as_u16() });
        }
        // Robots answer 200 with a non-zero errcode when they refuse a message.
        let reply = response.json::<WebhookReply>().await.unwrap_or_default();
        if reply.errcode != 0 {
            return Err(NotifyError::Rejected {
                errcode: reply.errcode,
                errmsg: reply.errmsg,
            });
        }
        Ok(())
    }
}

/// Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        info!(message = text, "notification");
        Ok(())
    }
}
