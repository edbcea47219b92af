pub mod dbfs;
pub mod health;
pub mod http;
pub mod warehouse;

use std::sync::Arc;

use serde_json::Value;

use crate::config::AppConfig;
use crate::tools::executor::ToolRegistry;

/// Registers every built-in tool. Warehouse tools share one workspace client.
pub fn register_builtins(registry: &mut ToolRegistry, config: &AppConfig, client: reqwest::Client) {
    let api = Arc::new(warehouse::WorkspaceApi::new(client.clone(), config.clone()));
    registry.register(Arc::new(health::Health::new(config.clone())));
    registry.register(Arc::new(http::CallApiEndpoint::new(client)));
    registry.register(Arc::new(warehouse::ListWarehouses::new(api.clone())));
    registry.register(Arc::new(warehouse::ListCatalogs::new(api.clone())));
    registry.register(Arc::new(warehouse::ListSchemas::new(api.clone())));
    registry.register(Arc::new(dbfs::ListDbfsFiles::new(api.clone())));
    registry.register(Arc::new(warehouse::CheckApiRegistry::new(
        api.clone(),
        config.warehouse_id.clone(),
        config.registry_table.clone(),
    )));
    registry.register(Arc::new(warehouse::ExecuteDbsql::new(api, config.warehouse_id.clone())));
}

pub fn as_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

pub fn as_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_builtins() {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &AppConfig::default(), reqwest::Client::new());
        assert_eq!(
            registry.names(),
            vec![
                "call_api_endpoint",
                "check_api_registry",
                "execute_dbsql",
                "health",
                "list_catalogs",
                "list_dbfs_files",
                "list_schemas",
                "list_warehouses"
            ]
        );
    }
}
