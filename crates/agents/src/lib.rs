use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dinchat_core::{respond_with, ChatReply, IntentCatalog};
use dinchat_observability::AppMetrics;
use dinchat_tenants::TenantDirectory;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatInput {
    /// `None` when the caller sent no usable text; handled as a blank message.
    pub message: Option<String>,
    pub client_id: Option<String>,
    pub session_id: Option<String>,
    pub msg_index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub session_id: String,
    pub client_id: String,
    #[serde(flatten)]
    pub reply: ChatReply,
}

#[derive(Clone)]
pub struct ResponderAgent<T>
where
    T: TenantDirectory,
{
    catalog: Arc<IntentCatalog>,
    tenants: Arc<T>,
    metrics: Arc<AppMetrics>,
}

impl<T> ResponderAgent<T>
where
    T: TenantDirectory,
{
    pub fn new(catalog: Arc<IntentCatalog>, tenants: Arc<T>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            catalog,
            tenants,
            metrics,
        }
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    pub fn tenants(&self) -> &T {
        &self.tenants
    }

    #[instrument(skip(self, input))]
    pub async fn handle_chat(&self, input: ChatInput) -> Result<ChatOutcome> {
        let started = Instant::now();

        let tenant = self.tenants.resolve(input.client_id.as_deref()).await?;
        let message = input.message.as_deref().unwrap_or_default();
        let reply = respond_with(&self.catalog, message, &tenant.responses);

        let elapsed = started.elapsed();
        self.metrics.record_reply(&reply, elapsed);

        let session_id = input
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(
            client_id = %tenant.client_id,
            session_id = %session_id,
            msg_index = ?input.msg_index,
            intent = reply.intent.as_deref().unwrap_or("none"),
            outcome = reply.outcome.as_str(),
            latency_micros = elapsed.as_micros() as u64,
            "chat handled"
        );

        Ok(ChatOutcome {
            session_id,
            client_id: tenant.client_id,
            reply,
        })
    }
}
