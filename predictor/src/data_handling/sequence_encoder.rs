use polars::prelude::*;
use tracing::debug;

use crate::models::{position_column, DNA_5MER};

/// Splits fixed-width nucleotide strings into one categorical column per position.
///
/// The width `N` is taken from the first sequence and every row must match it.
/// Columns are named `nt_pos1 .. nt_posN` and hold the single characters in
/// left-to-right order. Characters outside {A, T, C, G} are kept as they are;
/// they only turn into absent features when the table is normalised.
///
/// # Errors
///
/// * `NoData` for an empty input
/// * `SchemaMismatch` for a null or empty sequence, or one of a different width
pub fn encode_sequences<S: AsRef<str>>(sequences: &[S]) -> PolarsResult<DataFrame> {
    encode_rows(sequences.iter().map(|s| Some(s.as_ref())))
}

/// Same as [`encode_sequences`] for a polars string column.
pub fn encode_sequence_column(sequences: &StringChunked) -> PolarsResult<DataFrame> {
    encode_rows(sequences.into_iter())
}

fn encode_rows<'a>(rows: impl Iterator<Item = Option<&'a str>>) -> PolarsResult<DataFrame> {
    let mut positions: Vec<Vec<String>> = Vec::new();
    let mut width: Option<usize> = None;

    for (row, seq) in rows.enumerate() {
        let seq = seq.ok_or_else(|| {
            PolarsError::SchemaMismatch(format!("{} is null at row {}", DNA_5MER, row).into())
        })?;
        let chars: Vec<char> = seq.chars().collect();

        let expected = match width {
            Some(w) => w,
            None => {
                if chars.is_empty() {
                    return Err(PolarsError::SchemaMismatch(
                        format!("{} is empty at row {}", DNA_5MER, row).into(),
                    ));
                }
                positions = vec![Vec::new(); chars.len()];
                width = Some(chars.len());
                chars.len()
            }
        };

        if chars.len() != expected {
            return Err(PolarsError::SchemaMismatch(
                format!(
                    "{} at row {} has length {}, expected {} (set by the first row)",
                    DNA_5MER,
                    row,
                    chars.len(),
                    expected
                )
                .into(),
            ));
        }

        for (pos, c) in chars.into_iter().enumerate() {
            positions[pos].push(c.to_string());
        }
    }

    let Some(width) = width else {
        return Err(PolarsError::NoData("no sequences to encode".into()));
    };
    debug!("Encoding {} sequences of width {}", positions[0].len(), width);

    let columns = positions
        .into_iter()
        .enumerate()
        .map(|(i, values)| Column::new(position_column(i + 1).into(), values))
        .collect();
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(df: &DataFrame, i: usize) -> Vec<String> {
        df.get_columns()
            .iter()
            .map(|c| c.str().unwrap().get(i).unwrap().to_string())
            .collect()
    }

    #[test]
    fn splits_two_five_mers() {
        let df = encode_sequences(&["ATCGA", "TGGCA"]).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["nt_pos1", "nt_pos2", "nt_pos3", "nt_pos4", "nt_pos5"]);
        assert_eq!(df.height(), 2);
        assert_eq!(row(&df, 0), vec!["A", "T", "C", "G", "A"]);
        assert_eq!(row(&df, 1), vec!["T", "G", "G", "C", "A"]);
    }

    #[test]
    fn width_follows_first_sequence() {
        let seqs = ["GGACTGA", "AAACTTT", "CGATCGA"];
        let df = encode_sequences(&seqs).unwrap();
        assert_eq!(df.width(), 7);
        for (i, s) in seqs.iter().enumerate() {
            let joined: String = row(&df, i).concat();
            assert_eq!(&joined, s);
        }
    }

    #[test]
    fn out_of_domain_characters_pass_through() {
        let df = encode_sequences(&["ANCGu"]).unwrap();
        assert_eq!(row(&df, 0), vec!["A", "N", "C", "G", "u"]);
    }

    #[test]
    fn unequal_width_is_a_schema_error() {
        let err = encode_sequences(&["ATCGA", "ATCG"]).unwrap_err();
        assert!(matches!(err, PolarsError::SchemaMismatch(_)));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let none: [&str; 0] = [];
        assert!(matches!(encode_sequences(&none).unwrap_err(), PolarsError::NoData(_)));
        assert!(matches!(
            encode_sequences(&["", ""]).unwrap_err(),
            PolarsError::SchemaMismatch(_)
        ));
    }

    #[test]
    fn null_sequence_in_column_is_rejected() {
        let ca = StringChunked::new("DNA_5mer".into(), &[Some("GGACT"), None]);
        let err = encode_sequence_column(&ca).unwrap_err();
        assert!(matches!(err, PolarsError::SchemaMismatch(_)));
    }
}
