use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::tools::builtin::as_str;
use crate::tools::builtin::warehouse::WorkspaceApi;
use crate::tools::definition::{ToolDefinition, ToolOutput};
use crate::tools::executor::Tool;

pub struct ListDbfsFiles {
    api: Arc<WorkspaceApi>,
}

impl ListDbfsFiles {
    pub fn new(api: Arc<WorkspaceApi>) -> Self {
        Self { api }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileInfo>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    path: String,
    #[serde(default)]
    is_dir: bool,
    #[serde(default)]
    file_size: Option<i64>,
    #[serde(default)]
    modification_time: Option<i64>,
}

#[async_trait]
impl Tool for ListDbfsFiles {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_dbfs_files".to_string(),
            description: "List files and directories in DBFS (Databricks File System).".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "path": { "type": "string", "description": "DBFS path to list (default /)." } },
                "required": []
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, AppError> {
        let path = as_str(&args, "path")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "/".to_string());
        let raw = self.api.get("/api/2.0/dbfs/list", &[("path", path.as_str())]).await?;
        let list: FileList = serde_json::from_value(raw).map_err(|e| AppError::Tool(e.to_string()))?;

        // An empty directory comes back as `{}`.
        let files: Vec<Value> = list
            .files
            .into_iter()
            .map(|f| {
                json!({
                    "path": f.path,
                    "is_dir": f.is_dir,
                    "size": if f.is_dir { None } else { f.file_size },
                    "modification_time": f.modification_time
                })
            })
            .collect();
        let count = files.len();

        Ok(json!({
            "success": true,
            "path": path,
            "files": files,
            "count": count,
            "message": format!("Listed {count} item(s) in {path}")
        })
        .into())
    }
}
