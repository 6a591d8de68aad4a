//! Notification delegation. This service only shapes and posts the
//! request; delivery, templating and retry belong to the external
//! notification API behind NOTIFY_WEBHOOK_URL.

use crate::domain::models::{Employee, Survey};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPayload<'a> {
    email: &'a str,
    name: &'a str,
    survey_name: &'a str,
    end_date: Option<chrono::NaiveDate>,
    message: Option<&'a str>,
}

impl Notifier {
    pub fn from_env() -> Self {
        let webhook_url = std::env::var("NOTIFY_WEBHOOK_URL").ok().filter(|u| !u.is_empty());
        if webhook_url.is_none() {
            tracing::warn!("NOTIFY_WEBHOOK_URL not set; notification dispatch is disabled");
        }
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Post one reminder for one employee. Any non-2xx response is an
    /// error; the caller decides how to aggregate failures.
    pub async fn send(
        &self,
        employee: &Employee,
        survey: &Survey,
        message: Option<&str>,
    ) -> Result<()> {
        let url = self
            .webhook_url
            .as_deref()
            .context("NOTIFY_WEBHOOK_URL is not configured")?;

        let payload = NotificationPayload {
            email: &employee.email,
            name: &employee.name,
            survey_name: &survey.name,
            end_date: survey.end_date,
            message,
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .context("notification webhook request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "notification webhook returned {} for {}",
                response.status(),
                employee.email
            );
        }
        Ok(())
    }
}
