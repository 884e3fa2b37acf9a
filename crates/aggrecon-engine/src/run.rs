//! Comparison run
//!
//! A `ComparisonRun` owns everything produced for one reconciliation: both
//! tables' metadata, the generated statements and the raw aggregate rows.
//!
//! The pipeline has two phases:
//! 1. `plan` resolves both tables, then generates statements. Every column is
//!    resolved on both sides before any type is inferred, so inference always
//!    reads a complete snapshot of the counterpart.
//! 2. `execute` runs one statement per column, sequentially, per side. A
//!    failing column is recorded as an error marker and the run continues.
//!
//! Comparison reads the stored raw rows and can be repeated with different
//! rounding options without querying again.

use aggrecon_catalog::{BackendInfoResolver, ExecutionError, QueryExecutor, ResolutionError, TableIdentifier};
use aggrecon_core::{
    AggregateResults, BackendTableInfo, ColumnAggregates, ComparisonOptions, Diagnostic, DiagnosticCode,
    Report, Severity, Side, SideReport,
};
use aggrecon_sql::{AggregateQueryGenerator, AggregateQuerySet, DeclaredTypeSnapshot};
use thiserror::Error;

use crate::compare::{compare, ComparisonOutcome};
use crate::normalize::ResultNormalizer;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to resolve {side} table: {source}")]
    Resolution {
        side: Side,
        #[source]
        source: ResolutionError,
    },
}

/// Collaborators and identifiers for one side
pub struct RunSide<'a> {
    pub table_id: TableIdentifier,

    /// Snowflake database or BigQuery project
    pub database_identifier: String,

    pub resolver: &'a dyn BackendInfoResolver,
    pub executor: &'a dyn QueryExecutor,
}

/// What one side resolved, generated and fetched
#[derive(Debug, Clone, PartialEq)]
pub struct SideState {
    pub table_id: TableIdentifier,
    pub database_identifier: String,
    pub info: BackendTableInfo,
    pub queries: AggregateQuerySet,
    pub raw: AggregateResults,
}

impl SideState {
    pub fn to_report(&self) -> SideReport {
        SideReport {
            table_id: self.table_id.id(),
            database: self.database_identifier.clone(),
            table: self.info.clone(),
            queries: self.queries.to_map(),
            raw_results: self.raw.clone(),
        }
    }
}

/// State of a single reconciliation
#[derive(Debug, Clone)]
pub struct ComparisonRun {
    options: ComparisonOptions,
    origin: SideState,
    target: SideState,

    /// Inference notes and advisories, in the order they were raised
    notifications: Vec<Diagnostic>,
}

impl ComparisonRun {
    /// Resolve both tables and generate their statements
    pub async fn plan(
        origin: &RunSide<'_>,
        target: &RunSide<'_>,
        options: ComparisonOptions,
    ) -> Result<Self, RunError> {
        let origin_info = resolve_side(Side::Origin, origin).await?;
        let target_info = resolve_side(Side::Target, target).await?;

        let origin_snapshot = DeclaredTypeSnapshot::of(&origin_info);
        let target_snapshot = DeclaredTypeSnapshot::of(&target_info);

        let mut notifications = Vec::new();
        let origin_queries = generate_side(
            Side::Origin,
            origin,
            &origin_info,
            &target_snapshot,
            &options,
            &mut notifications,
        );
        let target_queries = generate_side(
            Side::Target,
            target,
            &target_info,
            &origin_snapshot,
            &options,
            &mut notifications,
        );

        Ok(Self {
            options,
            origin: SideState {
                table_id: origin.table_id.clone(),
                database_identifier: origin.database_identifier.clone(),
                info: origin_info,
                queries: origin_queries,
                raw: AggregateResults::new(),
            },
            target: SideState {
                table_id: target.table_id.clone(),
                database_identifier: target.database_identifier.clone(),
                info: target_info,
                queries: target_queries,
                raw: AggregateResults::new(),
            },
            notifications,
        })
    }

    /// Plan, then fetch aggregates for both sides
    pub async fn run(
        origin: &RunSide<'_>,
        target: &RunSide<'_>,
        options: ComparisonOptions,
    ) -> Result<Self, RunError> {
        let mut run = Self::plan(origin, target, options).await?;
        run.execute(origin.executor, target.executor).await;
        Ok(run)
    }

    /// Run every generated statement, origin first
    ///
    /// Each column gets an entry in the raw results, either its row or an
    /// error marker. Previous raw results are replaced.
    pub async fn execute(&mut self, origin: &dyn QueryExecutor, target: &dyn QueryExecutor) {
        let (raw, notes) = fetch_side(Side::Origin, &self.origin.queries, origin).await;
        self.origin.raw = raw;
        self.notifications.extend(notes);

        let (raw, notes) = fetch_side(Side::Target, &self.target.queries, target).await;
        self.target.raw = raw;
        self.notifications.extend(notes);
    }

    /// Normalize the stored raw results with `options` and compare them
    pub fn compare(&self, options: &ComparisonOptions) -> ComparisonOutcome {
        if self.origin.raw.is_empty() || self.target.raw.is_empty() {
            let missing: Vec<String> = [(Side::Origin, &self.origin), (Side::Target, &self.target)]
                .iter()
                .filter(|(_, state)| state.raw.is_empty())
                .map(|(side, _)| side.to_string())
                .collect();

            return ComparisonOutcome {
                results: Vec::new(),
                advisories: vec![Diagnostic::new(
                    DiagnosticCode::ResultsMissing,
                    Severity::Warn,
                    format!("No aggregate results for {}; nothing to compare", missing.join(" and ")),
                )],
            };
        }

        let normalizer = ResultNormalizer::from_options(options);
        let origin = normalizer.normalize(&self.origin.raw);
        let target = normalizer.normalize(&self.target.raw);

        let outcome = compare(&origin, &target, &self.origin.info, &self.target.info);
        tracing::info!(
            columns = outcome.results.len(),
            all_match = outcome.all_match(),
            "comparison complete"
        );
        outcome
    }

    /// Compare with `options` and collect everything into a report
    pub fn report(&self, options: &ComparisonOptions) -> Report {
        let outcome = self.compare(options);

        let mut diagnostics = self.notifications.clone();
        diagnostics.extend(outcome.verdict_diagnostics());
        diagnostics.extend(outcome.advisories);

        Report::from_results(outcome.results, diagnostics)
            .with_options(*options)
            .with_sides(self.origin.to_report(), self.target.to_report())
    }

    /// Options the run was planned with
    pub fn options(&self) -> &ComparisonOptions {
        &self.options
    }

    pub fn origin(&self) -> &SideState {
        &self.origin
    }

    pub fn target(&self) -> &SideState {
        &self.target
    }

    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Origin => &self.origin,
            Side::Target => &self.target,
        }
    }

    pub fn notifications(&self) -> &[Diagnostic] {
        &self.notifications
    }
}

async fn resolve_side(side: Side, run_side: &RunSide<'_>) -> Result<BackendTableInfo, RunError> {
    let info = run_side
        .resolver
        .resolve(&run_side.table_id)
        .await
        .map_err(|source| RunError::Resolution { side, source })?;

    tracing::info!(
        %side,
        table = %run_side.table_id,
        backend = %info.backend_kind,
        columns = info.columns.len(),
        "resolved table"
    );
    Ok(info)
}

fn generate_side(
    side: Side,
    run_side: &RunSide<'_>,
    info: &BackendTableInfo,
    counterpart: &DeclaredTypeSnapshot,
    options: &ComparisonOptions,
    notifications: &mut Vec<Diagnostic>,
) -> AggregateQuerySet {
    let backend_kind = run_side.executor.backend_kind();

    if backend_kind != info.backend_kind {
        tracing::warn!(%side, catalog = %info.backend_kind, warehouse = %backend_kind, "backend mismatch");
        notifications.push(
            Diagnostic::new(
                DiagnosticCode::BackendMismatch,
                Severity::Warn,
                format!(
                    "{} table {} is stored on {} but the configured warehouse is {}",
                    side, run_side.table_id, info.backend_kind, backend_kind
                ),
            )
            .with_side(side)
            .with_comparison(backend_kind.to_string(), info.backend_kind.to_string()),
        );
    }

    let generation = AggregateQueryGenerator::new(backend_kind, run_side.database_identifier.clone())
        .with_attempt_cast(options.attempt_cast)
        .generate(side, info, Some(counterpart));

    notifications.extend(generation.notifications);
    notifications.extend(generation.advisories);
    generation.queries
}

async fn fetch_side(
    side: Side,
    queries: &AggregateQuerySet,
    executor: &dyn QueryExecutor,
) -> (AggregateResults, Vec<Diagnostic>) {
    let mut raw = AggregateResults::new();
    let mut notes = Vec::new();

    for query in queries.iter() {
        tracing::info!(%side, backend = %executor.backend_kind(), column = %query.column, sql = %query.sql, "executing aggregate query");

        let outcome = match executor.execute(&query.sql).await {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(ExecutionError::EmptyResult),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(row) => {
                raw.insert(query.column.clone(), ColumnAggregates::Metrics(row));
            }
            Err(e) => {
                let message = format!("Failed to fetch aggregates for {}: {}", query.column, e);
                tracing::warn!(%side, column = %query.column, error = %e, "aggregate query failed");
                notes.push(
                    Diagnostic::new(DiagnosticCode::AggregateFetchFailed, Severity::Warn, message.clone())
                        .with_side(side)
                        .with_column(query.column.clone()),
                );
                raw.insert(query.column.clone(), ColumnAggregates::error(message));
            }
        }
    }

    (raw, notes)
}
