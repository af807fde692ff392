//! Best-effort notification dispatch.
//!
//! Notifications ride on a detached task so a slow or failing relay can never
//! delay or fail the operation that triggered them. Failures are logged and
//! swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    GuestInvited,
    BookingConfirmedGuest,
    BookingConfirmedOwner,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notifier returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        template: TemplateKind,
        payload: Value,
    ) -> Result<(), NotifyError>;
}

/// Posts notification jobs to the mail relay collaborator. Template rendering
/// and delivery live on the relay side.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: TemplateKind,
        payload: Value,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "recipient": recipient,
                "template": template,
                "payload": payload,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Used when no notifier endpoint is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: TemplateKind,
        _payload: Value,
    ) -> Result<(), NotifyError> {
        debug!(recipient, ?template, "Notifier not configured, dropping notification");
        Ok(())
    }
}

/// Fire-and-forget dispatch, decoupled from the caller's response path.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    recipient: String,
    template: TemplateKind,
    payload: Value,
) {
    tokio::spawn(async move {
        if let Err(err) = notifier.send(&recipient, template, payload).await {
            warn!(%recipient, ?template, "Notification dispatch failed: {err}");
        }
    });
}
