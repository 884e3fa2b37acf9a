//! Backend-specific quoting and casting

use aggrecon_core::BackendKind;

/// SQL spelling rules of one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDialect {
    kind: BackendKind,
}

impl BackendDialect {
    pub fn for_backend(kind: BackendKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Quote a single identifier: `"col"` on Snowflake, `` `col` `` on BigQuery
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self.kind {
            BackendKind::Snowflake => format!("\"{}\"", ident.replace('"', "\"\"")),
            BackendKind::BigQuery => format!("`{}`", escape_backticked(ident)),
        }
    }

    /// Fully qualified table reference
    ///
    /// Snowflake quotes each part (`"db"."schema"."table"`); BigQuery quotes the
    /// whole path once (`` `project.dataset.table` ``).
    pub fn qualified_table(&self, database: &str, schema: &str, table: &str) -> String {
        match self.kind {
            BackendKind::Snowflake => format!(
                "{}.{}.{}",
                self.quote_identifier(database),
                self.quote_identifier(schema),
                self.quote_identifier(table)
            ),
            BackendKind::BigQuery => format!(
                "`{}.{}.{}`",
                escape_backticked(database),
                escape_backticked(schema),
                escape_backticked(table)
            ),
        }
    }

    /// Numeric type targeted by safe casts
    pub fn numeric_cast_type(&self) -> &'static str {
        match self.kind {
            BackendKind::Snowflake => "NUMBER",
            BackendKind::BigQuery => "NUMERIC",
        }
    }

    /// Cast yielding NULL instead of failing on unconvertible values
    pub fn safe_cast(&self, expr: &str) -> String {
        match self.kind {
            BackendKind::Snowflake => format!("TRY_CAST({} AS {})", expr, self.numeric_cast_type()),
            BackendKind::BigQuery => format!("SAFE_CAST({} AS {})", expr, self.numeric_cast_type()),
        }
    }
}

fn escape_backticked(ident: &str) -> String {
    ident.replace('\\', "\\\\").replace('`', "\\`")
}
