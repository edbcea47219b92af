use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::llm::factory::{DatabricksClientFactory, ModelClientFactory};
use crate::tools::builtin::register_builtins;
use crate::tools::executor::ToolLimits;
use crate::tools::{ToolCatalog, ToolRegistry};
use crate::trace::TraceStore;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub traces: Arc<TraceStore>,
    pub registry: Arc<ToolRegistry>,
    pub catalog: Arc<ToolCatalog>,
    pub models: Arc<dyn ModelClientFactory>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.model_timeout_secs))
            .build()?;

        let mut registry = ToolRegistry::new().with_limits(ToolLimits::default());
        register_builtins(&mut registry, &config, client);

        let models = Arc::new(DatabricksClientFactory::new(config.clone()));
        Ok(Self::new(config, registry, models))
    }

    pub fn new(config: AppConfig, registry: ToolRegistry, models: Arc<dyn ModelClientFactory>) -> Self {
        let registry = Arc::new(registry);
        let catalog = Arc::new(ToolCatalog::new(registry.clone()));
        Self {
            traces: Arc::new(TraceStore::new(config.max_traces)),
            config: Arc::new(config),
            registry,
            catalog,
            models,
        }
    }
}
