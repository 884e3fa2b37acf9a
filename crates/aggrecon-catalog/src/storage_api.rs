//! Keboola Storage API resolver
//!
//! Table detail comes from `GET /v2/storage/tables/{id}`. The bucket carries
//! the backend; the schema is derived from the bucket id:
//! - Snowflake: the bucket id verbatim (`in.c-sales`)
//! - BigQuery: the bucket id with `.` and `-` replaced by `_` (`in_c_sales`)
//!
//! Declared types are read from the `KBC.datatype.basetype` column metadata
//! entry; columns without one are `UNKNOWN`.

use std::time::Duration;

use aggrecon_core::{BackendKind, BackendTableInfo, CatalogConfig, UNKNOWN_TYPE};
use serde_json::Value;

use crate::resolver::{BackendInfoResolver, ResolutionError, TableIdentifier};

/// Column metadata key holding the declared base type
pub const BASETYPE_METADATA_KEY: &str = "KBC.datatype.basetype";

const TOKEN_HEADER: &str = "X-StorageApi-Token";

/// Resolver backed by the Storage API
#[derive(Clone)]
pub struct StorageApiResolver {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl StorageApiResolver {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ResolutionError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("aggrecon/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ResolutionError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, ResolutionError> {
        let token = config.token().ok_or_else(|| {
            ResolutionError::ConfigError("Storage API token is not set".to_string())
        })?;
        Self::new(&config.url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, subject: &str) -> Result<Value, ResolutionError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "storage api request");

        let resp = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| ResolutionError::NetworkError(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => ResolutionError::AuthenticationError(format!("Storage API rejected the token: {}", body)),
                403 => ResolutionError::PermissionDenied(format!("Cannot access {}: {}", subject, body)),
                404 => ResolutionError::TableNotFound(subject.to_string()),
                code => ResolutionError::NetworkError(format!("HTTP {}: {}", code, body)),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ResolutionError::InvalidResponse(format!("Response is not JSON: {}", e)))
    }
}

#[async_trait::async_trait]
impl BackendInfoResolver for StorageApiResolver {
    fn name(&self) -> &'static str {
        "Storage API"
    }

    async fn resolve(&self, table: &TableIdentifier) -> Result<BackendTableInfo, ResolutionError> {
        let id = table.id();
        let detail = self
            .get_json(&format!("/v2/storage/tables/{}", id), &id)
            .await?;

        let info = parse_table_detail(&id, &detail)?;
        tracing::info!(
            table = %id,
            backend = %info.backend_kind,
            schema = %info.schema,
            columns = info.columns.len(),
            "resolved table"
        );
        Ok(info)
    }

    async fn test_connection(&self) -> Result<(), ResolutionError> {
        self.get_json("/v2/storage/tokens/verify", "token").await?;
        Ok(())
    }
}

/// Build `BackendTableInfo` from a table-detail payload
pub fn parse_table_detail(table_id: &str, detail: &Value) -> Result<BackendTableInfo, ResolutionError> {
    let invalid = |what: &str| {
        ResolutionError::InvalidResponse(format!("Table detail for '{}': {}", table_id, what))
    };

    let bucket = detail
        .get("bucket")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("'bucket' is missing or not an object"))?;
    let bucket_id = bucket
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("bucket 'id' is missing"))?;
    let backend = bucket
        .get("backend")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("bucket 'backend' is missing"))?;

    let backend_kind = BackendKind::from_name(backend)
        .ok_or_else(|| ResolutionError::UnsupportedBackend(backend.to_string()))?;

    let schema = match backend_kind {
        BackendKind::Snowflake => bucket_id.to_string(),
        BackendKind::BigQuery => bucket_id.replace(['.', '-'], "_"),
    };

    let name = detail
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("'name' is missing"))?;
    let table = detail
        .get("tablePhysicalName")
        .and_then(Value::as_str)
        .unwrap_or(name);

    let columns = detail
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("'columns' is missing or not an array"))?;

    // An empty metadata map is serialized as `[]`
    let metadata = match detail.get("columnMetadata") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(_) => return Err(invalid("'columnMetadata' is not an object")),
    };

    let mut info = BackendTableInfo::new(schema, table, backend_kind);
    for column in columns {
        let column = column
            .as_str()
            .ok_or_else(|| invalid("column names must be strings"))?;

        let declared = metadata
            .and_then(|m| m.get(column))
            .and_then(Value::as_array)
            .and_then(|items| {
                items.iter().find_map(|item| {
                    match item.get("key").and_then(Value::as_str) {
                        Some(BASETYPE_METADATA_KEY) => item.get("value").and_then(Value::as_str),
                        _ => None,
                    }
                })
            })
            .unwrap_or(UNKNOWN_TYPE);

        info = info.with_column(column, declared);
    }

    info.validate().map_err(|e| invalid(&e.to_string()))?;
    if info.columns.len() != columns.len() {
        return Err(invalid("duplicate column names"));
    }

    Ok(info)
}
