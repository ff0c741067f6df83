//! Webhook notification sink.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::{AppError, ExternalServiceError, NotificationEvent, NotificationSink};

/// Posts each notification as JSON to a fixed URL
pub struct WebhookNotificationSink {
    http_client: Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ExternalService(ExternalServiceError::Unavailable(e.to_string())))?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    #[instrument(skip(self, event))]
    async fn notify(&self, event: &NotificationEvent) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(ExternalServiceError::from)?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(
                ExternalServiceError::InvalidResponse(format!(
                    "webhook returned {}",
                    response.status()
                )),
            ));
        }
        debug!("Notification delivered");
        Ok(())
    }
}

/// Sink used when no webhook is configured
#[derive(Debug, Default)]
pub struct DisabledNotificationSink;

#[async_trait]
impl NotificationSink for DisabledNotificationSink {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), AppError> {
        debug!(?event, "Notifications disabled, dropping event");
        Ok(())
    }
}
