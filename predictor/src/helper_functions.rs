use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::models::polars_err;

pub fn read_csv(file_path: impl AsRef<Path>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path.as_ref())))?
        .finish()
}

/// Writes `df` as comma separated text, creating parent directories as needed.
pub fn dataframe_to_csv(df: &mut DataFrame, file_path: impl AsRef<Path>, include_header: bool) -> PolarsResult<()> {
    let path = file_path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| polars_err(Box::new(e)))?;
    }

    let mut file = File::create(path).map_err(|e| polars_err(Box::new(e)))?;
    CsvWriter::new(&mut file)
        .include_header(include_header)
        .with_separator(b',')
        .finish(df)?;

    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn csv_round_trip_keeps_quoted_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sites.csv");
        let mut df = df![
            "RNA_region" => &["3'UTR", "5'UTR"],
            "gc_content" => &[0.25, 0.5]
        ]
        .unwrap();

        dataframe_to_csv(&mut df, &path, true).unwrap();
        let back = read_csv(&path).unwrap();

        assert_eq!(back.shape(), (2, 2));
        let regions = back.column("RNA_region").unwrap().str().unwrap();
        assert_eq!(regions.get(0), Some("3'UTR"));
        assert_eq!(regions.get(1), Some("5'UTR"));
    }
}
