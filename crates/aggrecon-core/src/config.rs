//! Configuration schema (aggrecon.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::table::{BackendKind, Side};

/// Largest accepted `round_digits`
pub const MAX_ROUND_DIGITS: u32 = 10;

/// Default Keboola Storage API endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://connection.keboola.com";

/// How results are generated and normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonOptions {
    /// Wrap every column in a safe cast, not only those with unknown type
    #[serde(default)]
    pub attempt_cast: bool,

    /// Round numeric metrics before comparing
    #[serde(default)]
    pub round: bool,

    /// Digits kept when rounding
    #[serde(default = "default_round_digits")]
    pub round_digits: u32,
}

fn default_round_digits() -> u32 {
    2
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            attempt_cast: false,
            round: false,
            round_digits: default_round_digits(),
        }
    }
}

impl ComparisonOptions {
    /// Digits to round to, when rounding is on
    pub fn rounding(&self) -> Option<u32> {
        self.round.then_some(self.round_digits)
    }
}

/// Metadata catalog (Storage API) connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,

    /// API token, usually `${VAR}`
    #[serde(default)]
    pub token: String,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            token: String::new(),
        }
    }
}

impl CatalogConfig {
    /// Token with `${VAR}` expanded; `None` if empty or unset
    pub fn token(&self) -> Option<String> {
        expand_env(&self.token)
    }
}

/// Warehouse connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse type (snowflake, bigquery)
    #[serde(rename = "type")]
    pub warehouse_type: String,

    /// Connection settings (warehouse-specific)
    #[serde(flatten)]
    pub settings: HashMap<String, String>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            warehouse_type: "snowflake".to_string(),
            settings: HashMap::new(),
        }
    }
}

impl WarehouseConfig {
    pub fn new(warehouse_type: impl Into<String>) -> Self {
        Self {
            warehouse_type: warehouse_type.into(),
            settings: HashMap::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        BackendKind::from_name(&self.warehouse_type).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Unsupported warehouse type: '{}'. Supported: snowflake, bigquery",
                self.warehouse_type
            ))
        })
    }

    /// Setting value with `${VAR}` expanded; `None` if missing, empty or unset
    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).and_then(|value| expand_env(value))
    }

    /// Setting value that must be present
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.setting(key).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Missing required '{}' setting for {} warehouse",
                key, self.warehouse_type
            ))
        })
    }

    /// Database (Snowflake) or project id (BigQuery) that qualifies table names
    pub fn database_identifier(&self) -> Result<String, ConfigError> {
        match self.backend_kind()? {
            BackendKind::Snowflake => self.require("database"),
            BackendKind::BigQuery => self.require("project_id"),
        }
    }
}

/// One side of the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideConfig {
    /// Logical table id in the catalog, e.g. `in.c-sales.orders`
    pub table_id: String,

    #[serde(default)]
    pub catalog: CatalogConfig,

    pub warehouse: WarehouseConfig,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub comparison: ComparisonOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<SideConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<SideConfig>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: std::path::PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            comparison: ComparisonOptions::default(),
            origin: None,
            target: None,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Configuration of one side
    pub fn side(&self, side: Side) -> Result<&SideConfig, ConfigError> {
        let config = match side {
            Side::Origin => self.origin.as_ref(),
            Side::Target => self.target.as_ref(),
        };
        config.ok_or_else(|| ConfigError::ValidationError(format!("Missing [{}] section", side)))
    }

    /// Check option ranges, warehouse types and table ids
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.comparison.round_digits > MAX_ROUND_DIGITS {
            return Err(ConfigError::ValidationError(format!(
                "round_digits must be between 0 and {}, got {}",
                MAX_ROUND_DIGITS, self.comparison.round_digits
            )));
        }

        for side in Side::BOTH {
            let side_config = self.side(side)?;
            if side_config.table_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "[{}] table_id must not be empty",
                    side
                )));
            }
            side_config.warehouse.backend_kind()?;
        }

        Ok(())
    }
}

/// Expand a `${VAR}` value from the environment. Other values are returned as is.
/// Empty results and unset variables yield `None`.
pub fn expand_env(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let expanded = match trimmed.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var) => std::env::var(var).ok()?,
        None => value.to_string(),
    };

    if expanded.is_empty() {
        None
    } else {
        Some(expanded)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
