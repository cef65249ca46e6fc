use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use common::bootstrap::ClientFactory;
use common::config::Settings;
use common::credentials::CredentialProvider;
use common::errors::VertexError;
use common::vertex::ScheduleClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub clients: ClientFactory,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(
        config: Settings,
        provider: Arc<dyn CredentialProvider>,
        http_client: reqwest::Client,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            clients: ClientFactory::new(config.clone(), provider, http_client),
            config,
            metrics_handle,
        }
    }

    /// Fresh schedule client for the current request
    pub async fn schedule_client(&self) -> Result<ScheduleClient, VertexError> {
        self.clients.build().await
    }

    pub fn strict_status_codes(&self) -> bool {
        self.config.server.strict_status_codes
    }
}
