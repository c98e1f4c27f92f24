use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::Serialize;
use slotbook_core::{
    models::appointment::Appointment,
    notify::{NotificationEvent, Notifier},
};
use tracing::debug;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: NotificationEvent,
    appointment: &'a Appointment,
}

/// Posts every appointment event as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .wrap_err("Failed to build webhook client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { event, appointment })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(eyre::eyre!("Webhook returned {}: {}", status, error_text));
        }

        debug!(%event, appointment_id = %appointment.id, "Delivered webhook notification");
        Ok(())
    }
}
