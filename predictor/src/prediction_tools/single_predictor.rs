use polars::prelude::*;

use crate::classifiers::Classifier;
use crate::models::{feature_frame, FeatureRecord, M6aStatus, PREDICTED_PROB, PREDICTED_STATUS};
use crate::prediction_tools::batch_predictor::predict_batch;

/// Predicts a single site from scalar feature values.
///
/// Builds a one-row table and runs it through [`predict_batch`], so the
/// checks and encoding are exactly those of the batch path.
#[allow(clippy::too_many_arguments)]
pub fn predict_one<C: Classifier + ?Sized>(
    classifier: &C,
    gc_content: f64,
    rna_type: &str,
    rna_region: &str,
    exon_length: f64,
    distance_to_junction: f64,
    evolutionary_conservation: f64,
    dna_5mer: &str,
    threshold: f64,
) -> PolarsResult<(f64, M6aStatus)> {
    let record = FeatureRecord {
        gc_content,
        rna_type: rna_type.to_string(),
        rna_region: rna_region.to_string(),
        exon_length,
        distance_to_junction,
        evolutionary_conservation,
        dna_5mer: dna_5mer.to_string(),
    };
    predict_record(classifier, &record, threshold)
}

/// [`predict_one`] for an already assembled record.
pub fn predict_record<C: Classifier + ?Sized>(
    classifier: &C,
    record: &FeatureRecord,
    threshold: f64,
) -> PolarsResult<(f64, M6aStatus)> {
    let table = feature_frame(std::slice::from_ref(record))?;
    let predicted = predict_batch(classifier, &table, threshold)?;

    let prob = predicted.column(PREDICTED_PROB)?.f64()?.get(0);
    let status = predicted.column(PREDICTED_STATUS)?.str()?.get(0);
    match (prob, status) {
        (Some(prob), Some(status)) => Ok((prob, status.parse()?)),
        _ => Err(PolarsError::NoData("prediction produced no row".into())),
    }
}
