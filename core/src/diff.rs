//! # Profile Diff
//!
//! Reconciles two [`ProfileRecord`]s into the ordered rows the
//! presentation layer renders.
//!
//! Rows cover the union of both key sets. A key produced by only one
//! record renders the literal sentinel [`MISSING`] on the other side;
//! this is distinct from a field that was extracted as absent, which
//! participates as a value of its own. Equality is exact string
//! comparison, no coercion of any kind.

use std::collections::BTreeSet;

use crate::record::{AttributeGroup, AttributeKey, FieldValue, ProfileRecord};

/// Display sentinel for a key one record never produced.
pub const MISSING: &str = "missing";

/// One row of a profile comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow {
    pub group: AttributeGroup,
    /// Adapter index for adapter-group rows, so two adapters carrying the
    /// same field stay distinguishable in the output.
    pub index: Option<u32>,
    /// Bare field name, with the group prefix stripped.
    pub field: &'static str,
    pub left: String,
    pub right: String,
    pub matched: bool,
}

/// Ordered comparison of two profile records.
///
/// Rows are grouped by [`AttributeGroup`] in its fixed display order and
/// sorted by full attribute key within a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    pub rows: Vec<DiffRow>,
}

impl ComparisonResult {
    pub fn mismatches(&self) -> usize {
        self.rows.iter().filter(|row| !row.matched).count()
    }

    pub fn is_clean(&self) -> bool {
        self.rows.iter().all(|row| row.matched)
    }
}

/// Compares two records field by field.
///
/// With `diff_only` set, only mismatched rows are emitted; otherwise
/// every row carries its matched flag for downstream styling.
pub fn compare(left: &ProfileRecord, right: &ProfileRecord, diff_only: bool) -> ComparisonResult {
    let keys: BTreeSet<&AttributeKey> = left.keys().chain(right.keys()).collect();

    let mut rows = Vec::with_capacity(keys.len());
    for key in keys {
        let left_value = left.get(key);
        let right_value = right.get(key);
        let matched = match (left_value, right_value) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if diff_only && matched {
            continue;
        }
        rows.push(DiffRow {
            group: key.group,
            index: key.index,
            field: key.field,
            left: render(left_value),
            right: render(right_value),
            matched,
        });
    }

    ComparisonResult { rows }
}

fn render(value: Option<&FieldValue>) -> String {
    match value {
        Some(value) => value.render().to_string(),
        None => MISSING.to_string(),
    }
}
