//! Integration tests for catalog resolution and warehouse executors
//!
//! Tests that need a live Storage API token or warehouse credentials are
//! marked with `#[ignore]` and can be run with `cargo test -- --ignored`.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all non-ignored tests (no credentials required)
//! cargo test -p aggrecon-catalog --test integration_tests
//!
//! # Resolve a real table through the Storage API
//! KBC_URL=https://connection.keboola.com \
//! KBC_TOKEN=xxxx \
//! AGGRECON_TABLE_ID=in.c-sales.orders \
//! cargo test -p aggrecon-catalog --test integration_tests -- --ignored storage_api
//!
//! # Run Snowflake integration tests
//! SNOWFLAKE_ACCOUNT=xy12345 \
//! SNOWFLAKE_USER=user \
//! SNOWFLAKE_PASSWORD=pass \
//! cargo test -p aggrecon-catalog --features snowflake --test integration_tests -- --ignored
//!
//! # Run BigQuery integration tests
//! GOOGLE_APPLICATION_CREDENTIALS=/path/to/key.json \
//! AGGRECON_BIGQUERY_PROJECT=my-project \
//! cargo test -p aggrecon-catalog --features bigquery --test integration_tests -- --ignored
//! ```

mod fixtures;

use aggrecon_catalog::{
    executor_from_config, parse_table_detail, resolver_from_config, BackendInfoResolver, ExecutionError,
    MockExecutor, MockResolver, QueryExecutor, ResolutionError, TableIdentifier,
};
use aggrecon_core::{BackendKind, CatalogConfig, MetricValue, WarehouseConfig, UNKNOWN_TYPE};
use pretty_assertions::assert_eq;

// =============================================================================
// Helper Functions
// =============================================================================

fn has_storage_api_token() -> bool {
    std::env::var("KBC_TOKEN").is_ok() && std::env::var("AGGRECON_TABLE_ID").is_ok()
}

fn has_snowflake_credentials() -> bool {
    std::env::var("SNOWFLAKE_ACCOUNT").is_ok() && std::env::var("SNOWFLAKE_USER").is_ok()
}

fn has_bigquery_credentials() -> bool {
    std::env::var("AGGRECON_BIGQUERY_PROJECT").is_ok()
}

// =============================================================================
// Table Detail Parsing (No credentials required)
// =============================================================================

#[test]
fn test_snowflake_table_detail() {
    let info = parse_table_detail("in.c-sales.orders", &fixtures::orders_detail("snowflake")).unwrap();

    assert_eq!(info.backend_kind, BackendKind::Snowflake);
    assert_eq!(info.qualified_name(), "in.c-sales.orders");
    assert_eq!(info.columns, vec!["ID", "AMOUNT", "QTY", "NOTE"]);
    assert_eq!(info.declared_type("ID"), "INTEGER");
    assert_eq!(info.declared_type("AMOUNT"), "NUMERIC");
    assert_eq!(info.declared_type("QTY"), UNKNOWN_TYPE);
    assert_eq!(info.declared_type("NOTE"), "STRING");
}

#[test]
fn test_bigquery_table_detail_without_metadata() {
    let info = parse_table_detail("in.c-sales.orders", &fixtures::orders_detail_without_metadata()).unwrap();

    assert_eq!(info.backend_kind, BackendKind::BigQuery);
    assert_eq!(info.schema, "in_c_sales");
    assert_eq!(info.table, "orders");
    assert!(info.columns.iter().all(|c| info.declared_type(c) == UNKNOWN_TYPE));
}

#[test]
fn test_table_detail_error_names_table() {
    let mut detail = fixtures::orders_detail("snowflake");
    detail["columnMetadata"] = serde_json::json!("not metadata");

    match parse_table_detail("in.c-sales.orders", &detail) {
        Err(ResolutionError::InvalidResponse(msg)) => {
            assert!(msg.contains("in.c-sales.orders"));
            assert!(msg.contains("columnMetadata"));
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[test]
fn test_picker_display_string() {
    let table = TableIdentifier::from_display("in.c-sales.orders (orders)").unwrap();
    assert_eq!(table.id(), "in.c-sales.orders");
    assert_eq!(table.bucket_id(), "in.c-sales");
}

// =============================================================================
// Mock Collaborators (No credentials required)
// =============================================================================

#[tokio::test]
async fn test_mock_resolver_serves_parsed_detail() {
    let info = parse_table_detail("in.c-sales.orders", &fixtures::orders_detail("snowflake")).unwrap();
    let resolver = MockResolver::new().with_table("in.c-sales.orders", info.clone());

    let table = TableIdentifier::parse("in.c-sales.orders").unwrap();
    assert_eq!(resolver.resolve(&table).await.unwrap(), info);
    assert_eq!(resolver.name(), "Mock");
}

#[tokio::test]
async fn test_mock_executor_as_trait_object() {
    let executor: Box<dyn QueryExecutor> = Box::new(
        MockExecutor::new(BackendKind::Snowflake).with_metrics("AMOUNT", [("count", 100i64)]),
    );

    assert_eq!(executor.backend_kind(), BackendKind::Snowflake);
    let row = executor
        .execute("SELECT COUNT(\"AMOUNT\") AS \"count_AMOUNT\", MIN(\"AMOUNT\") AS \"min_AMOUNT\" FROM t;")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("count_AMOUNT"), Some(&MetricValue::Int(100)));
}

// =============================================================================
// Configuration (No credentials required)
// =============================================================================

#[test]
fn test_executor_requires_known_warehouse() {
    let config = WarehouseConfig::new("postgres");
    assert!(matches!(executor_from_config(&config), Err(ExecutionError::ConfigError(_))));
}

#[test]
fn test_snowflake_executor_requires_credentials() {
    let config = WarehouseConfig::new("snowflake")
        .with_setting("account", "xy12345")
        .with_setting("user", "loader");

    assert!(matches!(executor_from_config(&config), Err(ExecutionError::ConfigError(_))));
}

#[test]
fn test_resolver_from_config() {
    let config = CatalogConfig {
        url: "https://connection.eu-central-1.keboola.com".to_string(),
        token: "secret".to_string(),
    };
    let resolver = resolver_from_config(&config).unwrap();
    assert_eq!(resolver.name(), "Storage API");
}

// =============================================================================
// Storage API Integration Tests (require a token)
// =============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored storage_api
async fn test_storage_api_resolve() {
    if !has_storage_api_token() {
        eprintln!("Skipping Storage API test: set KBC_TOKEN and AGGRECON_TABLE_ID");
        return;
    }

    let config = CatalogConfig {
        url: std::env::var("KBC_URL").unwrap_or_else(|_| "https://connection.keboola.com".to_string()),
        token: std::env::var("KBC_TOKEN").unwrap(),
    };
    let resolver = resolver_from_config(&config).expect("Failed to create resolver");
    resolver.test_connection().await.expect("Token verification failed");

    let table = TableIdentifier::parse(&std::env::var("AGGRECON_TABLE_ID").unwrap()).unwrap();
    let info = resolver.resolve(&table).await.expect("Failed to resolve table");

    assert!(!info.columns.is_empty());
    println!("Resolved {} on {}:", info.qualified_name(), info.backend_kind);
    for column in &info.columns {
        println!("  {} ({})", column, info.declared_type(column));
    }
}

// =============================================================================
// Snowflake Integration Tests (require credentials)
// =============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test --features snowflake -- --ignored
async fn test_snowflake_connection() {
    if !has_snowflake_credentials() {
        eprintln!("Skipping Snowflake test: no credentials available");
        return;
    }

    #[cfg(feature = "snowflake")]
    {
        use aggrecon_catalog::SnowflakeExecutor;

        let mut builder = SnowflakeExecutor::builder(
            std::env::var("SNOWFLAKE_ACCOUNT").unwrap(),
            std::env::var("SNOWFLAKE_USER").unwrap(),
        );
        if let Ok(password) = std::env::var("SNOWFLAKE_PASSWORD") {
            builder = builder.with_password(password);
        }
        if let Ok(warehouse) = std::env::var("SNOWFLAKE_WAREHOUSE") {
            builder = builder.with_warehouse(warehouse);
        }

        let executor = builder.build().expect("Failed to create Snowflake executor");
        executor.test_connection().await.expect("Connection test failed");

        let row = executor
            .execute("SELECT MIN(v) AS \"min_v\", COUNT(v) AS \"count_v\" FROM (SELECT 1.50 AS v UNION ALL SELECT 2.25)")
            .await
            .expect("Aggregate query failed")
            .expect("Aggregate query returned no rows");
        assert_eq!(row.get("count_v"), Some(&MetricValue::Int(2)));
        println!("Snowflake row: {:?}", row);
    }

    #[cfg(not(feature = "snowflake"))]
    {
        eprintln!("Snowflake feature not enabled. Rebuild with --features snowflake");
    }
}

// =============================================================================
// BigQuery Integration Tests (require credentials)
// =============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test --features bigquery -- --ignored
async fn test_bigquery_connection() {
    if !has_bigquery_credentials() {
        eprintln!("Skipping BigQuery test: no credentials available");
        eprintln!("Set GOOGLE_APPLICATION_CREDENTIALS and AGGRECON_BIGQUERY_PROJECT");
        return;
    }

    #[cfg(feature = "bigquery")]
    {
        let config = WarehouseConfig::new("bigquery")
            .with_setting("project_id", std::env::var("AGGRECON_BIGQUERY_PROJECT").unwrap());
        let executor = executor_from_config(&config).expect("Failed to create BigQuery executor");
        executor.test_connection().await.expect("Connection test failed");

        let row = executor
            .execute("SELECT SUM(v) AS `sum_v`, COUNT(v) AS `count_v` FROM UNNEST([1, 2, 3]) AS v")
            .await
            .expect("Aggregate query failed")
            .expect("Aggregate query returned no rows");
        assert_eq!(row.get("sum_v"), Some(&MetricValue::Int(6)));
    }

    #[cfg(not(feature = "bigquery"))]
    {
        eprintln!("BigQuery feature not enabled. Rebuild with --features bigquery");
    }
}
