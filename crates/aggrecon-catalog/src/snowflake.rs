//! Snowflake query executor
//!
//! Each statement runs in its own session: the API client is built, used for
//! one statement and dropped, so nothing is pooled between columns.
//!
//! ## Authentication Methods
//!
//! 1. Password authentication (username/password)
//! 2. Key-pair authentication (private key PEM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let executor = SnowflakeExecutor::builder("xy12345.us-east-1", "RECON")
//!     .with_password("secret")
//!     .with_warehouse("COMPUTE_WH")
//!     .with_database("KBC_DB")
//!     .build()?;
//! let row = executor.execute("SELECT 1").await?;
//! ```
//!
//! Result rows arrive as Arrow batches. Fixed-point `NUMBER` columns are
//! encoded either as `Decimal128` or as plain integers carrying a `scale`
//! field metadata entry; both become exact decimal text when the scale is
//! non-zero.

use aggrecon_core::{BackendKind, MetricRow, MetricValue, WarehouseConfig};

use crate::executor::{ExecutionError, QueryExecutor};

#[cfg(feature = "snowflake")]
use snowflake_api::SnowflakeApi;

/// Snowflake authentication credentials
#[derive(Clone)]
pub enum SnowflakeCredentials {
    /// Password-based authentication
    Password(String),
    /// Key-pair authentication (PEM format private key)
    PrivateKey(String),
}

/// Builder for SnowflakeExecutor
pub struct SnowflakeExecutorBuilder {
    account: String,
    username: String,
    credentials: Option<SnowflakeCredentials>,
    warehouse: Option<String>,
    role: Option<String>,
    database: Option<String>,
}

impl SnowflakeExecutorBuilder {
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials = Some(SnowflakeCredentials::Password(password.into()));
        self
    }

    pub fn with_key_pair(mut self, private_key_pem: impl Into<String>) -> Self {
        self.credentials = Some(SnowflakeCredentials::PrivateKey(private_key_pem.into()));
        self
    }

    /// Set the warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Build the executor. Credentials are checked on first use.
    pub fn build(self) -> Result<SnowflakeExecutor, ExecutionError> {
        if cfg!(not(feature = "snowflake")) {
            return Err(not_compiled());
        }

        let credentials = self.credentials.ok_or_else(|| {
            ExecutionError::ConfigError("Snowflake requires a password or a private key".to_string())
        })?;

        Ok(SnowflakeExecutor {
            account: self.account,
            username: self.username,
            credentials,
            warehouse: self.warehouse,
            role: self.role,
            database: self.database,
        })
    }
}

/// Snowflake query executor
pub struct SnowflakeExecutor {
    account: String,
    username: String,
    credentials: SnowflakeCredentials,
    warehouse: Option<String>,
    role: Option<String>,
    database: Option<String>,
}

impl SnowflakeExecutor {
    pub fn builder(account: impl Into<String>, username: impl Into<String>) -> SnowflakeExecutorBuilder {
        SnowflakeExecutorBuilder {
            account: account.into(),
            username: username.into(),
            credentials: None,
            warehouse: None,
            role: None,
            database: None,
        }
    }

    /// Build from `[*.warehouse]` settings
    ///
    /// Keys: `account`, `user`, `password` or `private_key` / `private_key_path`,
    /// and optional `warehouse`, `role`, `database`.
    pub fn from_config(config: &WarehouseConfig) -> Result<Self, ExecutionError> {
        let setting = |key: &str| {
            config
                .require(key)
                .map_err(|e| ExecutionError::ConfigError(e.to_string()))
        };

        let account = setting("account")?;
        let user = config.setting("user").or_else(|| config.setting("username")).ok_or_else(|| {
            ExecutionError::ConfigError("Missing required 'user' setting for snowflake warehouse".to_string())
        })?;

        let mut builder = Self::builder(account, user);
        builder = if let Some(password) = config.setting("password") {
            builder.with_password(password)
        } else if let Some(pem) = config.setting("private_key") {
            builder.with_key_pair(pem)
        } else if let Some(path) = config.setting("private_key_path") {
            let pem = std::fs::read_to_string(&path).map_err(|e| {
                ExecutionError::ConfigError(format!("Failed to read private key '{}': {}", path, e))
            })?;
            builder.with_key_pair(pem)
        } else {
            builder
        };

        if let Some(warehouse) = config.setting("warehouse") {
            builder = builder.with_warehouse(warehouse);
        }
        if let Some(role) = config.setting("role") {
            builder = builder.with_role(role);
        }
        if let Some(database) = config.setting("database") {
            builder = builder.with_database(database);
        }

        builder.build()
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    #[cfg(feature = "snowflake")]
    fn connect(&self) -> Result<SnowflakeApi, ExecutionError> {
        match &self.credentials {
            SnowflakeCredentials::Password(password) => SnowflakeApi::with_password_auth(
                &self.account,
                self.warehouse.as_deref(),
                self.database.as_deref(),
                None, // schema
                &self.username,
                self.role.as_deref(),
                password,
            )
            .map_err(|e| ExecutionError::AuthenticationError(format!(
                "Failed to authenticate with Snowflake: {}",
                e
            ))),
            SnowflakeCredentials::PrivateKey(private_key_pem) => SnowflakeApi::with_certificate_auth(
                &self.account,
                self.warehouse.as_deref(),
                self.database.as_deref(),
                None, // schema
                &self.username,
                self.role.as_deref(),
                private_key_pem,
            )
            .map_err(|e| ExecutionError::AuthenticationError(format!(
                "Failed to authenticate with key-pair: {}",
                e
            ))),
        }
    }
}

#[async_trait::async_trait]
impl QueryExecutor for SnowflakeExecutor {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Snowflake
    }

    #[cfg(feature = "snowflake")]
    async fn execute(&self, sql: &str) -> Result<Option<MetricRow>, ExecutionError> {
        use snowflake_api::QueryResult;

        let api = self.connect()?;
        let result = api.exec(sql).await.map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("Incorrect username or password") || err_str.contains("JWT") {
                ExecutionError::AuthenticationError(err_str)
            } else {
                ExecutionError::QueryError(err_str)
            }
        })?;

        match result {
            QueryResult::Arrow(batches) => {
                let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
                    return Ok(None);
                };
                first_row(batch).map(Some)
            }
            QueryResult::Json(_) => Err(ExecutionError::InvalidResponse(
                "Unexpected JSON result format".to_string(),
            )),
            QueryResult::Empty => Ok(None),
        }
    }

    #[cfg(not(feature = "snowflake"))]
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
        "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string(),
    )
}

#[cfg(feature = "snowflake")]
fn first_row(batch: &arrow_array::RecordBatch) -> Result<MetricRow, ExecutionError> {
    let schema = batch.schema();
    let mut row = MetricRow::new();

    for (idx, field) in schema.fields().iter().enumerate() {
        let scale = field
            .metadata()
            .get("scale")
            .and_then(|s| s.parse::<i8>().ok())
            .unwrap_or(0);
        let value = arrow_cell(batch.column(idx), 0, scale).ok_or_else(|| {
            ExecutionError::InvalidResponse(format!(
                "Unsupported Arrow type {} for column {}",
                field.data_type(),
                field.name()
            ))
        })?;
        row.insert(field.name().clone(), value);
    }

    Ok(row)
}

/// Convert one Arrow cell; `None` for types aggregates never produce
#[cfg(feature = "snowflake")]
fn arrow_cell(array: &arrow_array::ArrayRef, row: usize, scale: i8) -> Option<MetricValue> {
    use arrow_array::cast::AsArray;
    use arrow_array::types::{
        Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    };
    use arrow_array::Array;
    use arrow_schema::DataType;

    if array.is_null(row) {
        return Some(MetricValue::Null);
    }

    let value = match array.data_type() {
        DataType::Int8 => scaled_integer(array.as_primitive::<Int8Type>().value(row).into(), scale),
        DataType::Int16 => scaled_integer(array.as_primitive::<Int16Type>().value(row).into(), scale),
        DataType::Int32 => scaled_integer(array.as_primitive::<Int32Type>().value(row).into(), scale),
        DataType::Int64 => scaled_integer(array.as_primitive::<Int64Type>().value(row).into(), scale),
        DataType::Decimal128(_, decimal_scale) => {
            scaled_integer(array.as_primitive::<Decimal128Type>().value(row), *decimal_scale)
        }
        DataType::Float32 => MetricValue::Float(array.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => MetricValue::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => MetricValue::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => MetricValue::Text(array.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => MetricValue::Text(array.as_boolean().value(row).to_string()),
        _ => return None,
    };

    Some(value)
}

/// Integer with an implied decimal scale
///
/// Scale 0 yields `Int` when the value fits, otherwise exact decimal text.
pub(crate) fn scaled_integer(raw: i128, scale: i8) -> MetricValue {
    if scale <= 0 {
        return match i64::try_from(raw) {
            Ok(v) if scale == 0 => MetricValue::Int(v),
            _ => MetricValue::Decimal(format!("{}{}", raw, "0".repeat(scale.unsigned_abs() as usize))),
        };
    }

    let scale = scale as usize;
    let digits = raw.unsigned_abs().to_string();
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if raw < 0 { "-" } else { "" };

    MetricValue::Decimal(format!("{}{}.{}", sign, int_part, frac_part))
}
