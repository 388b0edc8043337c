//! 咨询通知
//!
//! 顾客提交的咨询转发给店家 (webhook 或仅记录日志)。
//! 发送是 fire-and-forget：失败只记录日志，不影响请求结果。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Webhook 请求超时
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// 咨询内容
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Inquiry {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook rejected inquiry: {status} - {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait InquiryNotifier: Send + Sync + std::fmt::Debug {
    async fn notify(&self, inquiry: &Inquiry) -> Result<(), NotifyError>;
}

/// POST 到配置的 webhook
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build webhook client, using defaults");
                reqwest::Client::new()
            });
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl InquiryNotifier for WebhookNotifier {
    async fn notify(&self, inquiry: &Inquiry) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.url).json(inquiry).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}

/// 未配置 webhook 时只记录日志
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl InquiryNotifier for LogNotifier {
    async fn notify(&self, inquiry: &Inquiry) -> Result<(), NotifyError> {
        tracing::info!(
            name = %inquiry.name,
            email = %inquiry.email,
            length = inquiry.message.len(),
            "Inquiry received (no webhook configured)"
        );
        Ok(())
    }
}

/// 后台发送咨询，不等待结果
pub fn dispatch(notifier: Arc<dyn InquiryNotifier>, inquiry: Inquiry) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&inquiry).await {
            tracing::error!(email = %inquiry.email, error = %e, "Failed to forward inquiry");
        }
    });
}
