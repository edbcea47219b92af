use std::sync::Arc;
use std::time::Duration;

use crate::auth::Credentials;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::llm::databricks::DatabricksModelClient;
use crate::llm::provider::ModelClient;

/// Builds a model client for one request, so the caller's own token can be used.
pub trait ModelClientFactory: Send + Sync {
    fn client_for(&self, user_token: Option<&str>) -> Result<Arc<dyn ModelClient>, AppError>;
}

pub struct DatabricksClientFactory {
    config: AppConfig,
}

impl DatabricksClientFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl ModelClientFactory for DatabricksClientFactory {
    fn client_for(&self, user_token: Option<&str>) -> Result<Arc<dyn ModelClient>, AppError> {
        let credentials = Credentials::resolve(&self.config, user_token)?;
        let timeout = Duration::from_secs(self.config.model_timeout_secs);
        Ok(Arc::new(DatabricksModelClient::new(&credentials, timeout)?))
    }
}

/// Hands out the same client for every request.
pub struct StaticClientFactory(pub Arc<dyn ModelClient>);

impl ModelClientFactory for StaticClientFactory {
    fn client_for(&self, _user_token: Option<&str>) -> Result<Arc<dyn ModelClient>, AppError> {
        Ok(Arc::clone(&self.0))
    }
}
