//! Turns a raw feature table into the fixed schema the classifier was trained on.
//!
//! Preparation happens in three steps, each available on its own:
//!
//! 1. [`encoded_table`] checks the seven required columns and appends the
//!    per-position nucleotide columns derived from `DNA_5mer`.
//! 2. [`normalize_categories`] replaces categorical columns by level codes in
//!    the fixed level order and casts numeric features to `Float64`.
//! 3. [`classifier_input`] selects the trained feature columns in order.
//!
//! The caller's table is never modified; every step works on a copy.

use polars::prelude::*;
use tracing::debug;

use crate::data_handling::sequence_encoder::encode_sequence_column;
use crate::models::{
    position_index, Domain, DISTANCE_TO_JUNCTION, DNA_5MER, EVOLUTIONARY_CONSERVATION,
    EXON_LENGTH, GC_CONTENT, NUMERIC_FEATURES, REQUIRED_COLUMNS, RNA_REGION, RNA_TYPE,
};

/// Fails with `ColumnNotFound` naming every required column the table lacks.
pub fn check_schema(df: &DataFrame) -> PolarsResult<()> {
    let present: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PolarsError::ColumnNotFound(
            format!("feature table is missing required column(s): {}", missing.join(", ")).into(),
        ))
    }
}

/// Working copy of `df` with `nt_pos1 .. nt_posN` appended on the right.
///
/// Any positional columns the caller already had are replaced.
pub fn encoded_table(df: &DataFrame) -> PolarsResult<DataFrame> {
    check_schema(df)?;

    let column = df.column(DNA_5MER)?;
    let sequences = column.str().map_err(|_| {
        PolarsError::SchemaMismatch(
            format!("{} must be a string column, got {}", DNA_5MER, column.dtype()).into(),
        )
    })?;
    let positions = encode_sequence_column(sequences)?;

    let stale: Vec<PlSmallStr> = df
        .get_column_names()
        .into_iter()
        .filter(|c| position_index(c.as_str()).is_some())
        .cloned()
        .collect();
    let working = if stale.is_empty() {
        df.clone()
    } else {
        debug!("Replacing {} pre-existing positional column(s)", stale.len());
        df.drop_many(stale)
    };

    working.hstack(positions.get_columns())
}

/// Level-codes every categorical column and casts numeric features to `Float64`.
///
/// Categorical values outside their closed domain and NaN numeric values
/// become null, which the classifiers treat as an absent feature. Columns that are neither are kept
/// untouched.
pub fn normalize_categories(df: &DataFrame) -> PolarsResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(normalize_column)
        .collect::<PolarsResult<Vec<_>>>()?;
    DataFrame::new(columns)
}

fn normalize_column(column: &Column) -> PolarsResult<Column> {
    let name = column.name().as_str();

    if let Some(domain) = Domain::of_column(name) {
        let values = column.str().map_err(|_| {
            PolarsError::SchemaMismatch(
                format!("categorical column {} must hold strings, got {}", name, column.dtype()).into(),
            )
        })?;
        let codes: Vec<Option<u32>> = values
            .into_iter()
            .map(|v| v.and_then(|label| domain.code(label)))
            .collect();
        return Ok(Column::new(name.into(), codes));
    }

    if NUMERIC_FEATURES.contains(&name) {
        let cast = column
            .as_materialized_series()
            .strict_cast(&DataType::Float64)
            .map_err(|e| {
                PolarsError::SchemaMismatch(format!("column {} is not numeric: {}", name, e).into())
            })?;
        // NaN is an absent value, same as null
        let values: Vec<Option<f64>> = cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        return Ok(Column::new(name.into(), values));
    }

    Ok(column.clone())
}

/// Names of the feature columns handed to the classifier, in trained order.
pub fn feature_columns(kmer_width: usize) -> Vec<String> {
    let mut names: Vec<String> = [
        GC_CONTENT,
        RNA_TYPE,
        RNA_REGION,
        EXON_LENGTH,
        DISTANCE_TO_JUNCTION,
        EVOLUTIONARY_CONSERVATION,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    names.extend((1..=kmer_width).map(crate::models::position_column));
    names
}

/// Number of `nt_posN` columns in `df`.
pub fn kmer_width(df: &DataFrame) -> usize {
    df.get_column_names()
        .iter()
        .filter(|c| position_index(c.as_str()).is_some())
        .count()
}

/// Selects the trained feature columns of a normalised table, dropping the raw
/// sequence and any caller-specific extras.
pub fn classifier_input(normalized: &DataFrame) -> PolarsResult<DataFrame> {
    normalized.select(feature_columns(kmer_width(normalized)))
}

/// All three preparation steps in one go.
pub fn prepare_features(df: &DataFrame) -> PolarsResult<DataFrame> {
    let encoded = encoded_table(df)?;
    classifier_input(&normalize_categories(&encoded)?)
}
