use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::Credentials;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::tools::builtin::{as_str, as_u64};
use crate::tools::definition::{ToolDefinition, ToolOutput};
use crate::tools::executor::Tool;
use crate::trace::store::truncate;

const DEFAULT_ROW_LIMIT: u64 = 100;

/// Thin client for the workspace REST API, authenticated with the service credential.
pub struct WorkspaceApi {
    client: reqwest::Client,
    config: AppConfig,
}

impl WorkspaceApi {
    pub fn new(client: reqwest::Client, config: AppConfig) -> Self {
        Self { client, config }
    }

    fn credentials(&self) -> Result<Credentials, AppError> {
        Credentials::resolve(&self.config, None).map_err(|e| AppError::Tool(e.to_string()))
    }

    pub(crate) async fn get(&self, api_path: &str, query: &[(&str, &str)]) -> Result<Value, AppError> {
        let creds = self.credentials()?;
        let resp = self
            .client
            .get(format!("{}{}", creds.host, api_path))
            .query(query)
            .bearer_auth(&creds.token)
            .send()
            .await
            .map_err(|e| AppError::Tool(e.to_string()))?;
        read_json(resp).await
    }

    pub(crate) async fn post(&self, api_path: &str, body: &Value) -> Result<Value, AppError> {
        let creds = self.credentials()?;
        let resp = self
            .client
            .post(format!("{}{}", creds.host, api_path))
            .bearer_auth(&creds.token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Tool(e.to_string()))?;
        read_json(resp).await
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, AppError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(AppError::Tool(format!("Databricks API error: {status} {}", truncate(&text, 300))));
    }
    resp.json().await.map_err(|e| AppError::Tool(e.to_string()))
}

pub struct ListWarehouses {
    api: Arc<WorkspaceApi>,
}

impl ListWarehouses {
    pub fn new(api: Arc<WorkspaceApi>) -> Self {
        Self { api }
    }
}

#[derive(Debug, Deserialize)]
struct WarehouseList {
    #[serde(default)]
    warehouses: Vec<WarehouseInfo>,
}

#[derive(Debug, Deserialize)]
struct WarehouseInfo {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    cluster_size: Option<String>,
    #[serde(default)]
    warehouse_type: Option<String>,
    #[serde(default)]
    creator_name: Option<String>,
    #[serde(default)]
    auto_stop_mins: Option<i64>,
}

#[async_trait]
impl Tool for ListWarehouses {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_warehouses".to_string(),
            description: "List all SQL warehouses in the Databricks workspace.".to_string(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }

    async fn call(&self, _args: Value) -> Result<ToolOutput, AppError> {
        let raw = self.api.get("/api/2.0/sql/warehouses", &[]).await?;
        let list: WarehouseList = serde_json::from_value(raw).map_err(|e| AppError::Tool(e.to_string()))?;

        let warehouses: Vec<Value> = list
            .warehouses
            .into_iter()
            .map(|w| {
                json!({
                    "id": w.id,
                    "name": w.name,
                    "state": w.state.unwrap_or_else(|| "UNKNOWN".to_string()),
                    "size": w.cluster_size,
                    "type": w.warehouse_type.unwrap_or_else(|| "UNKNOWN".to_string()),
                    "creator": w.creator_name,
                    "auto_stop_mins": w.auto_stop_mins
                })
            })
            .collect();
        let count = warehouses.len();

        Ok(json!({
            "success": true,
            "warehouses": warehouses,
            "count": count,
            "message": format!("Found {count} SQL warehouse(s)")
        })
        .into())
    }
}

/// Runs SQL through the statement execution API. Values travel as named
/// parameters and are never spliced into the statement text.
pub struct ExecuteDbsql {
    api: Arc<WorkspaceApi>,
    default_warehouse: Option<String>,
}

impl ExecuteDbsql {
    pub fn new(api: Arc<WorkspaceApi>, default_warehouse: Option<String>) -> Self {
        Self {
            api,
            default_warehouse,
        }
    }
}

#[async_trait]
impl Tool for ExecuteDbsql {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "execute_dbsql".to_string(),
            description: "Execute a SQL statement on a Databricks SQL warehouse. Reference values as :name and pass them in `parameters`.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "warehouse_id": { "type": "string", "description": "Optional; defaults to the configured warehouse." },
                    "catalog": { "type": "string" },
                    "schema": { "type": "string" },
                    "limit": { "type": "integer", "description": "Maximum rows to return (default 100)." },
                    "parameters": { "type": "object", "description": "Named parameter values, e.g. {\"name\": \"sec_api\"}." }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, AppError> {
        let body = statement_request(&args, self.default_warehouse.as_deref())?;
        let limit = as_u64(&args, "limit").unwrap_or(DEFAULT_ROW_LIMIT) as usize;
        run_statement(&self.api, &body, limit).await.map(ToolOutput::Json)
    }
}

async fn run_statement(api: &WorkspaceApi, body: &Value, limit: usize) -> Result<Value, AppError> {
    info!(warehouse_id = %body["warehouse_id"], "executing SQL statement");
    let raw = api.post("/api/2.0/sql/statements", body).await?;
    statement_result(&raw, limit)
}

/// Reads the API registry table. The table name is bound through
/// `IDENTIFIER(:registry_table)` rather than spliced into the statement.
pub struct CheckApiRegistry {
    api: Arc<WorkspaceApi>,
    default_warehouse: Option<String>,
    table: String,
}

impl CheckApiRegistry {
    pub fn new(api: Arc<WorkspaceApi>, default_warehouse: Option<String>, table: String) -> Self {
        Self {
            api,
            default_warehouse,
            table,
        }
    }
}

#[async_trait]
impl Tool for CheckApiRegistry {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "check_api_registry".to_string(),
            description: format!(
                "List the API endpoints registered in the API registry table ({}).",
                self.table
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "warehouse_id": { "type": "string", "description": "Optional; defaults to the configured warehouse." },
                    "limit": { "type": "integer", "description": "Maximum rows to return (default 100)." }
                },
                "required": []
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, AppError> {
        let limit = as_u64(&args, "limit").unwrap_or(DEFAULT_ROW_LIMIT);
        let mut request = json!({
            "query": "SELECT * FROM IDENTIFIER(:registry_table)",
            "limit": limit,
            "parameters": { "registry_table": self.table }
        });
        if let Some(warehouse_id) = as_str(&args, "warehouse_id") {
            request["warehouse_id"] = Value::String(warehouse_id);
        }
        let body = statement_request(&request, self.default_warehouse.as_deref())?;

        let mut result = run_statement(&self.api, &body, limit as usize).await?;
        if result["success"] == true {
            let mut parts = self.table.splitn(3, '.');
            result["registry_info"] = json!({
                "catalog": parts.next(),
                "schema": parts.next(),
                "table": parts.next(),
                "description": "API registry containing all registered API endpoints"
            });
        }
        Ok(result.into())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogList {
    #[serde(default)]
    catalogs: Vec<NamedObject>,
}

#[derive(Debug, Deserialize)]
struct SchemaList {
    #[serde(default)]
    schemas: Vec<NamedObject>,
}

#[derive(Debug, Deserialize)]
struct NamedObject {
    name: String,
    #[serde(default)]
    comment: Option<String>,
}

pub struct ListCatalogs {
    api: Arc<WorkspaceApi>,
}

impl ListCatalogs {
    pub fn new(api: Arc<WorkspaceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ListCatalogs {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_catalogs".to_string(),
            description: "List Unity Catalog catalogs in the workspace.".to_string(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }

    async fn call(&self, _args: Value) -> Result<ToolOutput, AppError> {
        let raw = self.api.get("/api/2.1/unity-catalog/catalogs", &[]).await?;
        let list: CatalogList = serde_json::from_value(raw).map_err(|e| AppError::Tool(e.to_string()))?;
        let catalogs: Vec<Value> = list
            .catalogs
            .into_iter()
            .map(|c| json!({ "name": c.name, "comment": c.comment }))
            .collect();
        Ok(json!({ "success": true, "count": catalogs.len(), "catalogs": catalogs }).into())
    }
}

pub struct ListSchemas {
    api: Arc<WorkspaceApi>,
}

impl ListSchemas {
    pub fn new(api: Arc<WorkspaceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ListSchemas {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_schemas".to_string(),
            description: "List the schemas in a Unity Catalog catalog.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "catalog": { "type": "string", "description": "Catalog name." } },
                "required": ["catalog"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, AppError> {
        let catalog = as_str(&args, "catalog").ok_or_else(|| AppError::Tool("Missing catalog".to_string()))?;
        let raw = self
            .api
            .get("/api/2.1/unity-catalog/schemas", &[("catalog_name", catalog.as_str())])
            .await?;
        let list: SchemaList = serde_json::from_value(raw).map_err(|e| AppError::Tool(e.to_string()))?;
        let schemas: Vec<Value> = list
            .schemas
            .into_iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "catalog_name": catalog,
                    "full_name": format!("{catalog}.{}", s.name),
                    "comment": s.comment
                })
            })
            .collect();
        Ok(json!({
            "success": true,
            "catalog": catalog,
            "count": schemas.len(),
            "schemas": schemas
        })
        .into())
    }
}

fn statement_request(args: &Value, default_warehouse: Option<&str>) -> Result<Value, AppError> {
    let query = as_str(args, "query").ok_or_else(|| AppError::Tool("Missing query".to_string()))?;
    let warehouse_id = as_str(args, "warehouse_id")
        .or_else(|| default_warehouse.map(str::to_string))
        .ok_or_else(|| {
            AppError::Tool(
                "No SQL warehouse ID provided. Set DATABRICKS_SQL_WAREHOUSE_ID or pass warehouse_id.".to_string(),
            )
        })?;
    let limit = as_u64(args, "limit").unwrap_or(DEFAULT_ROW_LIMIT);

    let mut body = json!({
        "statement": query,
        "warehouse_id": warehouse_id,
        "wait_timeout": "30s",
        "row_limit": limit
    });
    if let Some(catalog) = as_str(args, "catalog") {
        body["catalog"] = Value::String(catalog);
    }
    if let Some(schema) = as_str(args, "schema") {
        body["schema"] = Value::String(schema);
    }
    if let Some(Value::Object(params)) = args.get("parameters") {
        let params: Vec<Value> = params
            .iter()
            .map(|(name, value)| match value {
                Value::Null => json!({ "name": name }),
                Value::String(s) => json!({ "name": name, "value": s }),
                other => json!({ "name": name, "value": other.to_string() }),
            })
            .collect();
        body["parameters"] = Value::Array(params);
    }
    Ok(body)
}

fn statement_result(raw: &Value, limit: usize) -> Result<Value, AppError> {
    let state = raw
        .pointer("/status/state")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN");
    match state {
        "SUCCEEDED" => {}
        "FAILED" | "CANCELED" | "CLOSED" => {
            let message = raw
                .pointer("/status/error/message")
                .and_then(Value::as_str)
                .unwrap_or("statement did not succeed");
            return Err(AppError::Tool(format!("SQL statement {state}: {message}")));
        }
        _ => {
            return Ok(json!({
                "success": false,
                "state": state,
                "statement_id": raw.get("statement_id"),
                "error": "Statement still running after 30s wait"
            }))
        }
    }

    let columns: Vec<String> = raw
        .pointer("/manifest/schema/columns")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let Some(data) = raw.pointer("/result/data_array").and_then(Value::as_array) else {
        return Ok(json!({
            "success": true,
            "data": { "message": "Query executed successfully with no results" },
            "row_count": 0
        }));
    };

    let rows: Vec<Value> = data
        .iter()
        .take(limit)
        .map(|row| {
            let cells = row.as_array().cloned().unwrap_or_default();
            let obj: serde_json::Map<String, Value> = columns
                .iter()
                .cloned()
                .zip(cells.into_iter().chain(std::iter::repeat(Value::Null)))
                .collect();
            Value::Object(obj)
        })
        .collect();

    Ok(json!({
        "success": true,
        "data": { "columns": columns, "rows": rows },
        "row_count": rows.len()
    }))
}
