use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use polars::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::data_handling::feature_table::encoded_table;
use crate::models::Domain;

/// Values of one categorical column that fall outside its closed domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainViolation {
    pub column: String,
    /// 0-based row indices, ascending.
    pub rows: Vec<usize>,
    /// Distinct offending values; a missing value is listed as `null`.
    pub values: BTreeSet<String>,
}

/// Result of the out-of-domain pass over a feature table.
///
/// Such values are not fatal: they reach the classifier as absent features.
/// The report lets callers notice that instead of getting a silently degraded
/// prediction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainReport {
    pub violations: Vec<DomainViolation>,
}

impl DomainReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Rows with at least one out-of-domain value.
    pub fn affected_rows(&self) -> BTreeSet<usize> {
        self.violations
            .iter()
            .flat_map(|v| v.rows.iter().copied())
            .collect()
    }

    pub fn violation(&self, column: &str) -> Option<&DomainViolation> {
        self.violations.iter().find(|v| v.column == column)
    }

    /// One warning per affected column.
    pub fn log(&self) {
        for v in &self.violations {
            warn!(
                "{} row(s) with out-of-domain {} value(s) {:?}; treated as absent by the classifier",
                v.rows.len(),
                v.column,
                v.values
            );
        }
    }
}

impl fmt::Display for DomainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "all categorical values are within their domains");
        }
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {} row(s), values {:?}", v.column, v.rows.len(), v.values)?;
        }
        Ok(())
    }
}

/// Checks the schema, encodes the sequences and reports every categorical
/// value outside its domain. Fails only on schema errors.
pub fn check_domains(feature_table: &DataFrame) -> PolarsResult<DomainReport> {
    domain_report(&encoded_table(feature_table)?)
}

/// Out-of-domain pass over a table that already carries the positional columns.
pub fn domain_report(encoded: &DataFrame) -> PolarsResult<DomainReport> {
    let mut violations = Vec::new();

    for column in encoded.get_columns() {
        let Some(domain) = Domain::of_column(column.name().as_str()) else {
            continue;
        };
        let values = column.str()?;

        let mut offending: BTreeMap<usize, String> = BTreeMap::new();
        for (row, value) in values.into_iter().enumerate() {
            match value {
                Some(label) if domain.code(label).is_some() => {}
                Some(label) => {
                    offending.insert(row, label.to_string());
                }
                None => {
                    offending.insert(row, "null".to_string());
                }
            }
        }

        if !offending.is_empty() {
            violations.push(DomainViolation {
                column: column.name().to_string(),
                rows: offending.keys().copied().collect(),
                values: offending.into_values().collect(),
            });
        }
    }

    Ok(DomainReport { violations })
}
