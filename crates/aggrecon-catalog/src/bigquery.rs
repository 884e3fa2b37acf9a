//! BigQuery query executor
//!
//! A client is created per statement and dropped afterwards. Query results
//! come back over REST with every cell encoded as a JSON string, so values
//! are re-typed here: integer text becomes `Int`, other numeric text stays
//! exact as `Decimal`.
//!
//! ## Authentication
//!
//! 1. Service account JSON content (inline)
//! 2. Service account JSON file (explicit path)
//! 3. Application Default Credentials (ADC)

use aggrecon_core::{BackendKind, MetricRow, MetricValue, WarehouseConfig};
use serde_json::Value;

use crate::executor::{ExecutionError, QueryExecutor};

#[cfg(feature = "bigquery")]
use gcp_bigquery_client::{Client as BigQueryClient, model::query_request::QueryRequest};

/// How the executor authenticates
#[derive(Clone)]
pub enum BigQueryCredentials {
    /// Inline service account key JSON
    ServiceAccountJson(String),
    /// Path to a service account key file
    KeyFile(String),
    /// GOOGLE_APPLICATION_CREDENTIALS, gcloud defaults or the metadata server
    ApplicationDefault,
}

/// BigQuery query executor
pub struct BigQueryExecutor {
    /// Project the jobs run in
    project_id: String,

    credentials: BigQueryCredentials,
}

impl BigQueryExecutor {
    pub fn new(project_id: impl Into<String>, credentials: BigQueryCredentials) -> Result<Self, ExecutionError> {
        if cfg!(not(feature = "bigquery")) {
            return Err(not_compiled());
        }

        Ok(Self {
            project_id: project_id.into(),
            credentials,
        })
    }

    /// Build from `[*.warehouse]` settings
    ///
    /// Keys: `project_id`, and one of `service_account_json` or `key_path`.
    /// Without either, Application Default Credentials are used.
    pub fn from_config(config: &WarehouseConfig) -> Result<Self, ExecutionError> {
        let project_id = config
            .require("project_id")
            .map_err(|e| ExecutionError::ConfigError(e.to_string()))?;

        let credentials = if let Some(json) = config.setting("service_account_json") {
            BigQueryCredentials::ServiceAccountJson(json)
        } else if let Some(path) = config.setting("key_path") {
            BigQueryCredentials::KeyFile(path)
        } else {
            BigQueryCredentials::ApplicationDefault
        };

        Self::new(project_id, credentials)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[cfg(feature = "bigquery")]
    async fn connect(&self) -> Result<BigQueryClient, ExecutionError> {
        match &self.credentials {
            BigQueryCredentials::ServiceAccountJson(key_json) => {
                let sa_key: gcp_bigquery_client::yup_oauth2::ServiceAccountKey =
                    serde_json::from_str(key_json).map_err(|e| ExecutionError::ConfigError(format!(
                        "Failed to parse service account JSON: {}",
                        e
                    )))?;

                BigQueryClient::from_service_account_key(sa_key, false)
                    .await
                    .map_err(|e| ExecutionError::AuthenticationError(format!(
                        "Failed to authenticate with service account: {}",
                        e
                    )))
            }
            BigQueryCredentials::KeyFile(path) => BigQueryClient::from_service_account_key_file(path)
                .await
                .map_err(|e| ExecutionError::AuthenticationError(format!(
                    "Failed to read service account key file '{}': {}",
                    path, e
                ))),
            BigQueryCredentials::ApplicationDefault => BigQueryClient::from_application_default_credentials()
                .await
                .map_err(|e| ExecutionError::AuthenticationError(format!(
                    "Failed to authenticate with ADC: {}. \
                     Ensure GOOGLE_APPLICATION_CREDENTIALS is set or run 'gcloud auth application-default login'",
                    e
                ))),
        }
    }
}

#[async_trait::async_trait]
impl QueryExecutor for BigQueryExecutor {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::BigQuery
    }

    #[cfg(feature = "bigquery")]
    async fn execute(&self, sql: &str) -> Result<Option<MetricRow>, ExecutionError> {
        use gcp_bigquery_client::model::query_response::ResultSet;

        let client = self.connect().await?;
        let response = client
            .job()
            .query(&self.project_id, QueryRequest::new(sql.to_string()))
            .await
            .map_err(|e| ExecutionError::QueryError(e.to_string()))?;

        let mut rs = ResultSet::new_from_query_response(response);
        if !rs.next_row() {
            return Ok(None);
        }

        let mut row = MetricRow::new();
        for name in rs.column_names() {
            let cell = rs
                .get_json_value_by_name(&name)
                .map_err(|e| ExecutionError::InvalidResponse(format!("Failed to read {}: {}", name, e)))?;
            row.insert(name, cell_value(cell.as_ref()));
        }

        Ok(Some(row))
    }

    #[cfg(not(feature = "bigquery"))]
    async fn execute(&self, _sql: &str) -> Result<Option<MetricRow>, ExecutionError> {
        Err(not_compiled())
    }

    async fn test_connection(&self) -> Result<(), ExecutionError> {
        self.execute("SELECT 1")
            .await
            .map_err(|e| ExecutionError::QueryError(format!("Connection test failed: {}", e)))?;
        Ok(())
    }
}

fn not_compiled() -> ExecutionError {
    ExecutionError::ConfigError(
        "BigQuery support not compiled. Rebuild with: cargo build --features bigquery".to_string(),
    )
}

/// Re-type one REST cell
pub(crate) fn cell_value(cell: Option<&Value>) -> MetricValue {
    match cell {
        None | Some(Value::Null) => MetricValue::Null,
        Some(Value::String(text)) => {
            if let Ok(i) = text.parse::<i64>() {
                MetricValue::Int(i)
            } else if text.parse::<f64>().is_ok_and(f64::is_finite) {
                MetricValue::Decimal(text.clone())
            } else {
                MetricValue::Text(text.clone())
            }
        }
        Some(other) => MetricValue::from_json(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(None), MetricValue::Null);
        assert_eq!(cell_value(Some(&json!(null))), MetricValue::Null);
        assert_eq!(cell_value(Some(&json!("100"))), MetricValue::Int(100));
        assert_eq!(cell_value(Some(&json!("50.5"))), MetricValue::Decimal("50.5".into()));
        assert_eq!(cell_value(Some(&json!("1.0E3"))), MetricValue::Decimal("1.0E3".into()));
        assert_eq!(cell_value(Some(&json!("NaN"))), MetricValue::Text("NaN".into()));
        assert_eq!(cell_value(Some(&json!("abc"))), MetricValue::Text("abc".into()));
        assert_eq!(cell_value(Some(&json!(7))), MetricValue::Int(7));
    }

    #[test]
    fn test_from_config_requires_project() {
        let config = WarehouseConfig::new("bigquery").with_setting("key_path", "/tmp/key.json");
        assert!(matches!(
            BigQueryExecutor::from_config(&config),
            Err(ExecutionError::ConfigError(_))
        ));
    }

    #[test]
    #[cfg(feature = "bigquery")]
    fn test_from_config_defaults_to_adc() {
        let config = WarehouseConfig::new("bigquery").with_setting("project_id", "my-project");
        let executor = BigQueryExecutor::from_config(&config).unwrap();
        assert_eq!(executor.project_id(), "my-project");
        assert!(matches!(executor.credentials, BigQueryCredentials::ApplicationDefault));
    }

    #[test]
    #[cfg(not(feature = "bigquery"))]
    fn test_not_compiled() {
        let result = BigQueryExecutor::new("my-project", BigQueryCredentials::ApplicationDefault);
        match result {
            Err(ExecutionError::ConfigError(msg)) => assert!(msg.contains("--features bigquery")),
            _ => panic!("expected ConfigError"),
        }
    }
}
