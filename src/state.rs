//! Shared application state.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::events::OrderEvent;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Best-effort event publish; failures are logged, never surfaced to
    /// the request that triggered them.
    pub async fn publish(&self, event: &OrderEvent) {
        let Some(nats) = &self.nats else { return };
        match serde_json::to_vec(event) {
            Ok(payload) => {
                if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
                    tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "event serialization failed"),
        }
    }
}
