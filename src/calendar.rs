//! Optional external-calendar collaborator. Its absence or failure must never
//! block booking: events are created on a detached task after the booking
//! transaction commits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    pub attendees: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait CalendarWriter: Send + Sync {
    async fn create_event(&self, event: CalendarEvent) -> Result<(), CalendarError>;
}

pub struct HttpCalendarWriter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCalendarWriter {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl CalendarWriter for HttpCalendarWriter {
    async fn create_event(&self, event: CalendarEvent) -> Result<(), CalendarError> {
        let response = self.client.post(&self.endpoint).json(&event).send().await?;
        if !response.status().is_success() {
            return Err(CalendarError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Fire-and-forget event creation; a missing writer is a no-op.
pub fn dispatch_event(writer: Option<Arc<dyn CalendarWriter>>, event: CalendarEvent) {
    let Some(writer) = writer else {
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = writer.create_event(event).await {
            warn!("Calendar event creation failed: {err}");
        }
    });
}
