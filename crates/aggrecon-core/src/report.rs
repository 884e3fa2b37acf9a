//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::comparison::{AggregateResults, ColumnComparisonResult, ColumnStatus};
use crate::config::ComparisonOptions;
use crate::diagnostic::{Diagnostic, Severity};
use crate::table::BackendTableInfo;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Columns present on both sides and compared
    pub columns_compared: usize,

    pub matched: usize,

    pub mismatched: usize,

    /// Columns whose query failed on either side
    pub errored: usize,

    /// Number of warning notifications
    pub warnings: usize,

    /// Total number of notifications
    pub notifications: usize,
}

/// What was resolved, generated and fetched for one side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideReport {
    /// Logical table identifier as configured
    pub table_id: String,

    /// Database (Snowflake) or project (BigQuery) queried
    pub database: String,

    pub table: BackendTableInfo,

    /// Column → generated SQL
    pub queries: BTreeMap<String, String>,

    /// Column → raw aggregate row or error marker
    pub raw_results: AggregateResults,
}

/// Comparison report (report.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Options the results were normalized and compared with
    pub options: ComparisonOptions,

    /// Summary statistics
    pub summary: ReportSummary,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<SideReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<SideReport>,

    /// One verdict per common column
    pub results: Vec<ColumnComparisonResult>,

    /// All notifications raised during the run
    pub diagnostics: Vec<Diagnostic>,

    /// Metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            options: ComparisonOptions::default(),
            summary: ReportSummary::default(),
            origin: None,
            target: None,
            results: Vec::new(),
            diagnostics: Vec::new(),
            metadata: None,
        }
    }

    /// Create a report from comparison results and notifications
    pub fn from_results(results: Vec<ColumnComparisonResult>, diagnostics: Vec<Diagnostic>) -> Self {
        let mut report = Self::new();
        for result in results {
            report.add_result(result);
        }
        for diagnostic in diagnostics {
            report.add_diagnostic(diagnostic);
        }
        report
    }

    pub fn with_options(mut self, options: ComparisonOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sides(mut self, origin: SideReport, target: SideReport) -> Self {
        self.origin = Some(origin);
        self.target = Some(target);
        self
    }

    /// Add a column verdict to the report
    pub fn add_result(&mut self, result: ColumnComparisonResult) {
        match result.overall_status {
            ColumnStatus::Match => self.summary.matched += 1,
            ColumnStatus::Mismatch => self.summary.mismatched += 1,
            ColumnStatus::Error => self.summary.errored += 1,
        }

        self.summary.columns_compared += 1;
        self.results.push(result);
    }

    /// Add a notification to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity >= Severity::Warn {
            self.summary.warnings += 1;
        }

        self.summary.notifications += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Any column mismatched or errored
    pub fn has_failures(&self) -> bool {
        self.summary.mismatched > 0 || self.summary.errored > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
