use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::AppError;
use crate::tools::definition::ToolDefinition;
use crate::tools::executor::ToolRegistry;

/// Where the catalog comes from.
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, AppError>;
}

#[async_trait]
impl ToolSource for ToolRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, AppError> {
        Ok(self.definitions())
    }
}

/// Tool catalog cached after the first load.
pub struct ToolCatalog {
    source: Arc<dyn ToolSource>,
    cache: RwLock<Option<Arc<Vec<ToolDefinition>>>>,
}

impl ToolCatalog {
    pub fn new(source: Arc<dyn ToolSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    pub async fn load(&self, force_reload: bool) -> Result<Arc<Vec<ToolDefinition>>, AppError> {
        if !force_reload {
            if let Some(cached) = self.cache.read().await.as_ref() {
                return Ok(Arc::clone(cached));
            }
        }

        let mut cache = self.cache.write().await;
        if !force_reload {
            if let Some(cached) = cache.as_ref() {
                return Ok(Arc::clone(cached));
            }
        }

        let tools = Arc::new(self.source.list_tools().await?);
        info!(count = tools.len(), force_reload, "tool catalog loaded");
        *cache = Some(Arc::clone(&tools));
        Ok(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl ToolSource for Counting {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, AppError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((0..n)
                .map(|i| ToolDefinition {
                    name: format!("tool_{i}"),
                    description: String::new(),
                    parameters: serde_json::Value::Null,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn caches_until_forced() {
        let source = Arc::new(Counting(AtomicUsize::new(0)));
        let catalog = ToolCatalog::new(source.clone());

        assert_eq!(catalog.load(false).await.unwrap().len(), 1);
        assert_eq!(catalog.load(false).await.unwrap().len(), 1);
        assert_eq!(source.0.load(Ordering::SeqCst), 1);

        assert_eq!(catalog.load(true).await.unwrap().len(), 2);
        assert_eq!(catalog.load(false).await.unwrap().len(), 2);
        assert_eq!(source.0.load(Ordering::SeqCst), 2);
    }
}
