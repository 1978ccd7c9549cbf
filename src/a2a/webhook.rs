//! Push notification delivery
//!
//! Finished task results are POSTed to the caller's callback URL on a detached
//! task. Delivery problems are logged and never reach the JSON-RPC response.

use super::PushNotificationConfig;
use crate::error::AgentError;
use crate::models::TaskResult;
use crate::Result;
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Only this scheme list gets a bearer token attached
pub const BEARER_SCHEME: &str = "TelexApiKey";

#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    /// Fire-and-forget delivery. The handle is only useful to tests.
    pub fn notify(&self, config: PushNotificationConfig, task: TaskResult) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&config, &task).await {
                warn!(url = %config.url, task_id = %task.id, error = %e, "Webhook delivery failed");
            }
        })
    }

    pub async fn send(&self, config: &PushNotificationConfig, task: &TaskResult) -> Result<()> {
        let mut request = self.client.post(&config.url).json(task);

        if let Some(token) = bearer_token(config) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::ProtocolError(format!(
                "Webhook {} answered {}",
                config.url, status
            )));
        }

        info!(url = %config.url, task_id = %task.id, "Webhook delivered");
        Ok(())
    }
}

fn bearer_token(config: &PushNotificationConfig) -> Option<&str> {
    let auth = config.authentication.as_ref()?;
    if auth.schemes.len() == 1 && auth.schemes[0] == BEARER_SCHEME {
        auth.credentials.as_deref()
    } else {
        None
    }
}
