// Bootstrap utilities for binary initialization
// Builds the long-lived pieces once and hands out a fresh ScheduleClient per request.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Settings;
use crate::credentials::{CredentialProvider, StaticCredentialProvider};
use crate::errors::VertexError;
use crate::retry::{self, RetryStrategy};
use crate::transport::HttpTransport;
use crate::vertex::{Endpoints, ScheduleClient};

/// Initialize the shared reqwest client (connection pool only; timeouts are per call)
///
/// # Errors
/// Returns error if the TLS backend cannot be initialized
#[tracing::instrument]
pub fn init_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;
    info!("HTTP client initialized");
    Ok(client)
}

/// Credential provider backed by the `[gcp]` section
pub fn init_credential_provider(settings: &Settings) -> Arc<dyn CredentialProvider> {
    Arc::new(StaticCredentialProvider::from_config(&settings.gcp))
}

/// Builds one `ScheduleClient` per request from the provider's cached credentials
#[derive(Clone)]
pub struct ClientFactory {
    settings: Arc<Settings>,
    provider: Arc<dyn CredentialProvider>,
    http_client: reqwest::Client,
    retry: Arc<dyn RetryStrategy>,
}

impl ClientFactory {
    pub fn new(
        settings: Arc<Settings>,
        provider: Arc<dyn CredentialProvider>,
        http_client: reqwest::Client,
    ) -> Self {
        let retry: Arc<dyn RetryStrategy> = Arc::from(retry::from_config(&settings.vertex.retry));
        Self {
            settings,
            provider,
            http_client,
            retry,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            self.settings.vertex.api_base_url.clone(),
            self.settings.storage.api_base_url.clone(),
        )
    }

    /// Fresh client bound to the current credentials
    ///
    /// # Errors
    /// Configuration error when the provider fails or a credential is missing
    pub async fn build(&self) -> Result<ScheduleClient, VertexError> {
        let credentials = self.provider.get_cached().await.inspect_err(|e| {
            error!(error = %e, "Credential provider failed");
        })?;

        let transport = Arc::new(HttpTransport::with_client(
            self.http_client.clone(),
            self.settings.vertex.timeout_seconds,
        ));

        Ok(ScheduleClient::new(credentials, transport)?
            .with_endpoints(self.endpoints())
            .with_retry(self.retry.clone())
            .with_max_pages(self.settings.vertex.max_pages)
            .with_notebook_root(self.settings.storage.notebook_root.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigurationError;
    use crate::models::RawCredentials;

    fn settings_with_credentials() -> Settings {
        let mut settings = Settings::default();
        settings.gcp.access_token = Some("tok".to_string());
        settings.gcp.project_id = Some("demo".to_string());
        settings.gcp.region_id = Some("us-central1".to_string());
        settings
    }

    #[tokio::test]
    async fn test_factory_builds_client_from_configured_credentials() {
        let settings = settings_with_credentials();
        let provider = init_credential_provider(&settings);
        let factory = ClientFactory::new(Arc::new(settings), provider, init_http_client().unwrap());

        let client = factory.build().await.unwrap();
        assert_eq!(client.credentials().project_id(), "demo");
    }

    #[tokio::test]
    async fn test_factory_reports_missing_credentials() {
        let settings = Settings::default();
        let provider = init_credential_provider(&settings);
        let factory = ClientFactory::new(Arc::new(settings), provider, init_http_client().unwrap());

        let err = factory.build().await.unwrap_err();
        assert_eq!(
            err,
            VertexError::Configuration(ConfigurationError::MissingCredentials(vec![
                "access_token".to_string(),
                "project_id".to_string(),
                "region_id".to_string(),
            ]))
        );
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl CredentialProvider for FailingProvider {
        async fn get_cached(&self) -> Result<RawCredentials, ConfigurationError> {
            Err(ConfigurationError::ProviderFailed("gcloud not found".to_string()))
        }
    }

    #[tokio::test]
    async fn test_factory_propagates_provider_failure() {
        let factory = ClientFactory::new(
            Arc::new(Settings::default()),
            Arc::new(FailingProvider),
            init_http_client().unwrap(),
        );
        let err = factory.build().await.unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }

    #[test]
    fn test_endpoints_follow_overrides() {
        let mut settings = Settings::default();
        settings.vertex.api_base_url = Some("http://127.0.0.1:9000/".to_string());
        let factory = ClientFactory::new(
            Arc::new(settings),
            Arc::new(StaticCredentialProvider::default()),
            init_http_client().unwrap(),
        );
        assert_eq!(
            factory.endpoints().schedules("demo", "us-central1"),
            "http://127.0.0.1:9000/v1/projects/demo/locations/us-central1/schedules"
        );
    }
}
