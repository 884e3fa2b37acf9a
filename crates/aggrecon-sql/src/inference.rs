//! Effective column types
//!
//! A column whose declared type is `UNKNOWN` borrows the declared type of the
//! same-named column on the other side. Inference reads a snapshot of the
//! other side's declared types taken after both sides were resolved, so the
//! order in which sides are processed never matters.

use std::collections::BTreeMap;

use aggrecon_core::{
    is_numeric_type, is_unknown_type, BackendTableInfo, Diagnostic, DiagnosticCode, Severity, Side,
    UNKNOWN_TYPE,
};

/// Read-only copy of one side's declared types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredTypeSnapshot {
    types: BTreeMap<String, String>,
}

impl DeclaredTypeSnapshot {
    pub fn of(info: &BackendTableInfo) -> Self {
        Self {
            types: info
                .columns
                .iter()
                .map(|column| (column.clone(), info.declared_type(column).to_string()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<(String, String)> for DeclaredTypeSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

/// Outcome of resolving one column's type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolution {
    pub column: String,

    /// Declared type as resolved locally (upper-case)
    pub original_type: String,

    /// Type used for numeric eligibility (upper-case)
    pub effective_type: String,

    /// The effective type came from the other side
    pub inferred: bool,
}

impl TypeResolution {
    pub fn is_numeric(&self) -> bool {
        is_numeric_type(&self.effective_type)
    }

    pub fn was_unknown(&self) -> bool {
        is_unknown_type(&self.original_type)
    }
}

/// Resolve the effective type of `column` on `side`
///
/// Returns the resolution and, when the type was taken from the counterpart,
/// an informational note naming the column, side and inferred type.
pub fn infer_effective_type(
    side: Side,
    column: &str,
    local_type: &str,
    counterpart_type: Option<&str>,
) -> (TypeResolution, Option<Diagnostic>) {
    let original_type = local_type.trim().to_uppercase();

    let borrowed = counterpart_type
        .map(|t| t.trim().to_uppercase())
        .filter(|t| is_unknown_type(&original_type) && !t.is_empty() && !is_unknown_type(t));

    match borrowed {
        Some(effective_type) => {
            let note = Diagnostic::new(
                DiagnosticCode::TypeInferred,
                Severity::Info,
                format!(
                    "Column '{}' on {}: type inferred from other side as {}",
                    column, side, effective_type
                ),
            )
            .with_side(side)
            .with_column(column)
            .with_comparison(UNKNOWN_TYPE, effective_type.clone());

            let resolution = TypeResolution {
                column: column.to_string(),
                original_type,
                effective_type,
                inferred: true,
            };
            (resolution, Some(note))
        }
        None => {
            let resolution = TypeResolution {
                column: column.to_string(),
                effective_type: original_type.clone(),
                original_type,
                inferred: false,
            };
            (resolution, None)
        }
    }
}

/// Resolves effective types for one side and collects inference notes
pub struct TypeInferenceEngine<'a> {
    side: Side,
    counterpart: Option<&'a DeclaredTypeSnapshot>,
    notes: Vec<Diagnostic>,
}

impl<'a> TypeInferenceEngine<'a> {
    pub fn new(side: Side, counterpart: Option<&'a DeclaredTypeSnapshot>) -> Self {
        Self {
            side,
            counterpart,
            notes: Vec::new(),
        }
    }

    /// Resolve one column, recording a note if its type was inferred
    pub fn resolve(&mut self, column: &str, local_type: &str) -> TypeResolution {
        let counterpart_type = self.counterpart.and_then(|snapshot| snapshot.get(column));
        let (resolution, note) = infer_effective_type(self.side, column, local_type, counterpart_type);

        if let Some(note) = note {
            tracing::debug!(side = %self.side, column, inferred = %resolution.effective_type, "type inferred from other side");
            self.notes.push(note);
        }

        resolution
    }

    /// Resolve every column of a table, in column order
    pub fn resolve_table(&mut self, info: &BackendTableInfo) -> Vec<TypeResolution> {
        info.columns
            .iter()
            .map(|column| self.resolve(column, info.declared_type(column)))
            .collect()
    }

    pub fn notes(&self) -> &[Diagnostic] {
        &self.notes
    }

    pub fn into_notes(self) -> Vec<Diagnostic> {
        self.notes
    }
}
