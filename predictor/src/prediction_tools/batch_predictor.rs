use polars::prelude::*;
use tracing::{debug, info};

use crate::classifiers::Classifier;
use crate::data_handling::domain_report::domain_report;
use crate::data_handling::feature_table::{classifier_input, encoded_table, kmer_width, normalize_categories};
use crate::models::{M6aStatus, PREDICTED_PROB, PREDICTED_STATUS};

/// Predicts m6A status for every row of `feature_table`.
///
/// The returned table is the input table, untouched and in the same row
/// order, with `predicted_m6A_prob` and `predicted_m6A_status` appended on the
/// right. A row is Positive only when its probability is strictly greater
/// than `threshold`.
///
/// # Errors
///
/// * `ColumnNotFound` when a required column is missing
/// * `SchemaMismatch` for unequal sequence widths, non-numeric features, or a
///   sequence width the classifier was not trained on
/// * `ComputeError` for a NaN threshold
/// * whatever the classifier returns, unchanged
///
/// All checks run before the classifier is called; nothing is returned for a
/// table that fails them.
pub fn predict_batch<C: Classifier + ?Sized>(
    classifier: &C,
    feature_table: &DataFrame,
    threshold: f64,
) -> PolarsResult<DataFrame> {
    if threshold.is_nan() {
        return Err(PolarsError::ComputeError("threshold must be a number, got NaN".into()));
    }

    let encoded = encoded_table(feature_table)?;
    let width = kmer_width(&encoded);
    if let Some(trained) = classifier.kmer_width() {
        if trained != width {
            return Err(PolarsError::SchemaMismatch(
                format!("sequences have width {}, the classifier was trained on {}", width, trained).into(),
            ));
        }
    }
    domain_report(&encoded)?.log();

    let features = classifier_input(&normalize_categories(&encoded)?)?;

    debug!("Scoring {} sites with {} features", features.height(), features.width());
    let probabilities = classifier.predict_proba(&features)?;
    let positive = positive_mass(&probabilities, feature_table.height())?;

    let statuses: Vec<&str> = positive
        .iter()
        .map(|&p| M6aStatus::from_probability(p, threshold).label())
        .collect();
    let n_positive = statuses.iter().filter(|&&s| s == M6aStatus::POSITIVE).count();
    info!(
        "Predicted {} of {} sites as m6A positive (threshold {})",
        n_positive,
        statuses.len(),
        threshold
    );

    // prediction columns go on the right of the caller's table
    let base = feature_table.drop_many([PREDICTED_PROB, PREDICTED_STATUS]);
    base.hstack(&[
        Column::new(PREDICTED_PROB.into(), positive),
        Column::new(PREDICTED_STATUS.into(), statuses),
    ])
}

/// Positive-class probabilities from a classifier's output, checked for shape
/// and range. NaN fails the range check.
fn positive_mass(probabilities: &DataFrame, expected_rows: usize) -> PolarsResult<Vec<f64>> {
    let column = probabilities.column(M6aStatus::POSITIVE)?;
    let values = column.f64()?;

    if values.len() != expected_rows {
        return Err(PolarsError::ShapeMismatch(
            format!(
                "classifier returned {} probabilities for {} rows",
                values.len(),
                expected_rows
            )
            .into(),
        ));
    }
    if values.null_count() > 0 {
        return Err(PolarsError::ComputeError(
            format!("classifier returned {} missing probabilities", values.null_count()).into(),
        ));
    }
    let positive: Vec<f64> = values.into_no_null_iter().collect();
    if let Some((row, p)) = positive
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(PolarsError::ComputeError(
            format!("classifier returned probability {} for row {}, outside [0, 1]", p, row).into(),
        ));
    }
    Ok(positive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::probability_frame;
    use crate::models::REQUIRED_COLUMNS;
    use ndarray::Array1;
    use polars::df;
    use std::sync::Mutex;

    /// Returns fixed Positive probabilities and remembers what it was given.
    struct FixedClassifier {
        positive: Vec<f64>,
        seen: Mutex<Option<DataFrame>>,
    }

    impl FixedClassifier {
        fn new(positive: &[f64]) -> Self {
            FixedClassifier {
                positive: positive.to_vec(),
                seen: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            usize::from(self.seen.lock().unwrap().is_some())
        }
    }

    impl Classifier for FixedClassifier {
        fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame> {
            *self.seen.lock().unwrap() = Some(features.clone());
            probability_frame(Array1::from(self.positive.clone()))
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict_proba(&self, _features: &DataFrame) -> PolarsResult<DataFrame> {
            Err(PolarsError::ComputeError("model exploded".into()))
        }
    }

    fn sites() -> DataFrame {
        df![
            "site_id" => &["a", "b", "c"],
            "gc_content" => &[0.45, 0.62, 0.3],
            "RNA_type" => &["mRNA", "lincRNA", "pseudogene"],
            "RNA_region" => &["3'UTR", "CDS", "intron"],
            "exon_length" => &[1200i64, 85, 410],
            "distance_to_junction" => &[-14i64, 230, 0],
            "evolutionary_conservation" => &[0.83, 0.12, 0.5],
            "DNA_5mer" => &["GGACT", "AGACA", "TGACC"]
        ]
        .unwrap()
    }

    fn statuses(df: &DataFrame) -> Vec<String> {
        df.column(PREDICTED_STATUS)
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn appends_two_columns_and_keeps_input() {
        let input = sites();
        let classifier = FixedClassifier::new(&[0.9, 0.1, 0.5]);
        let out = predict_batch(&classifier, &input, 0.5).unwrap();

        assert_eq!(out.height(), input.height());
        assert_eq!(out.width(), input.width() + 2);
        assert!(out.select(input.get_column_names_owned()).unwrap().equals(&input));

        let names = out.get_column_names();
        assert_eq!(names[names.len() - 2].as_str(), PREDICTED_PROB);
        assert_eq!(names[names.len() - 1].as_str(), PREDICTED_STATUS);
        assert_eq!(statuses(&out), vec!["Positive", "Negative", "Negative"]);
    }

    #[test]
    fn threshold_is_strict() {
        let classifier = FixedClassifier::new(&[0.7, 0.7, 0.7]);
        let above = predict_batch(&classifier, &sites(), 0.5).unwrap();
        assert_eq!(statuses(&above), vec!["Positive"; 3]);

        let equal = predict_batch(&classifier, &sites(), 0.7).unwrap();
        assert_eq!(statuses(&equal), vec!["Negative"; 3]);
        let probs = equal.column(PREDICTED_PROB).unwrap().f64().unwrap();
        assert_eq!(probs.get(0), Some(0.7));
    }

    #[test]
    fn classifier_receives_encoded_features() {
        let classifier = FixedClassifier::new(&[0.1, 0.2, 0.3]);
        predict_batch(&classifier, &sites(), 0.5).unwrap();

        let seen = classifier.seen.lock().unwrap().clone().unwrap();
        let names: Vec<&str> = seen.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "gc_content",
                "RNA_type",
                "RNA_region",
                "exon_length",
                "distance_to_junction",
                "evolutionary_conservation",
                "nt_pos1",
                "nt_pos2",
                "nt_pos3",
                "nt_pos4",
                "nt_pos5",
            ]
        );
        let region = seen.column("RNA_region").unwrap().u32().unwrap();
        assert_eq!(region.into_no_null_iter().collect::<Vec<_>>(), vec![2, 0, 1]);
        let first = seen.column("nt_pos1").unwrap().u32().unwrap();
        assert_eq!(first.into_no_null_iter().collect::<Vec<_>>(), vec![3, 0, 1]);
    }

    #[test]
    fn missing_column_fails_before_classifier() {
        let classifier = FixedClassifier::new(&[0.9, 0.1, 0.5]);
        for column in REQUIRED_COLUMNS {
            let input = sites().drop(column).unwrap();
            let err = predict_batch(&classifier, &input, 0.5).unwrap_err();
            assert!(matches!(err, PolarsError::ColumnNotFound(_)));
        }
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn unequal_sequence_width_fails_before_classifier() {
        let mut input = sites();
        input
            .with_column(Series::new("DNA_5mer".into(), &["GGACT", "AGAC", "TGACC"]))
            .unwrap();
        let classifier = FixedClassifier::new(&[0.9, 0.1, 0.5]);
        let err = predict_batch(&classifier, &input, 0.5).unwrap_err();
        assert!(matches!(err, PolarsError::SchemaMismatch(_)));
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn out_of_domain_values_still_predict() {
        let mut input = sites();
        input
            .with_column(Series::new("RNA_type".into(), &["mRNA", "snRNA", "pseudogene"]))
            .unwrap();
        let classifier = FixedClassifier::new(&[0.9, 0.8, 0.1]);
        let out = predict_batch(&classifier, &input, 0.5).unwrap();
        assert_eq!(out.height(), 3);

        let seen = classifier.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.column("RNA_type").unwrap().null_count(), 1);
        // the output still shows what the caller sent
        assert_eq!(out.column("RNA_type").unwrap().str().unwrap().get(1), Some("snRNA"));
    }

    #[test]
    fn classifier_errors_propagate_unchanged() {
        let err = predict_batch(&FailingClassifier, &sites(), 0.5).unwrap_err();
        match err {
            PolarsError::ComputeError(msg) => assert_eq!(msg.to_string(), "model exploded"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn probabilities_outside_unit_interval_are_rejected() {
        for bad in [f64::NAN, 1.7, -0.1] {
            let classifier = FixedClassifier::new(&[0.2, bad, 0.4]);
            let err = predict_batch(&classifier, &sites(), 0.5).unwrap_err();
            assert!(matches!(err, PolarsError::ComputeError(_)));
        }

        let edges = FixedClassifier::new(&[0.0, 1.0, 0.5]);
        let out = predict_batch(&edges, &sites(), 0.5).unwrap();
        assert_eq!(statuses(&out), vec!["Negative", "Positive", "Negative"]);
    }

    #[test]
    fn short_classifier_output_is_rejected() {
        let classifier = FixedClassifier::new(&[0.9]);
        let err = predict_batch(&classifier, &sites(), 0.5).unwrap_err();
        assert!(matches!(err, PolarsError::ShapeMismatch(_)));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let classifier = FixedClassifier::new(&[0.9, 0.1, 0.5]);
        assert!(predict_batch(&classifier, &sites(), f64::NAN).is_err());
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn trained_width_must_match() {
        struct ThreeMer;
        impl Classifier for ThreeMer {
            fn predict_proba(&self, _features: &DataFrame) -> PolarsResult<DataFrame> {
                unreachable!("width check runs first")
            }
            fn kmer_width(&self) -> Option<usize> {
                Some(3)
            }
        }
        let err = predict_batch(&ThreeMer, &sites(), 0.5).unwrap_err();
        assert!(matches!(err, PolarsError::SchemaMismatch(_)));
    }
}
