// Credential provider seam
// Token acquisition and refresh live outside this crate; providers only hand out cached values.

use async_trait::async_trait;

use crate::config::GcpConfig;
use crate::errors::ConfigurationError;
use crate::models::{Credentials, RawCredentials};

/// Source of `{access_token, project_id, region_id}`
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_cached(&self) -> Result<RawCredentials, ConfigurationError>;
}

/// Provider backed by values loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: RawCredentials,
}

impl StaticCredentialProvider {
    pub fn new(credentials: RawCredentials) -> Self {
        Self { credentials }
    }

    pub fn from_config(config: &GcpConfig) -> Self {
        Self::new(RawCredentials {
            access_token: config.access_token.clone(),
            project_id: config.project_id.clone(),
            region_id: config.region_id.clone(),
        })
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get_cached(&self) -> Result<RawCredentials, ConfigurationError> {
        Ok(self.credentials.clone())
    }
}

/// Bearer authorization header for Google APIs
pub fn auth_headers(credentials: &Credentials) -> Vec<(String, String)> {
    vec![(
        "Authorization".to_string(),
        format!("Bearer {}", credentials.access_token()),
    )]
}
