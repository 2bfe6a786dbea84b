use std::collections::BTreeMap;

use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifiers::{check_feature, feature_view, probability_frame, Classifier, FeatureView};
use crate::models::Domain;

/// Standardised numeric term: contributes `beta * (x - mean) / std`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTerm {
    pub beta: f64,
    pub mean: f64,
    pub std: f64,
}

/// Logistic model over standardised numeric features and one-hot categorical
/// levels. Categorical coefficients are listed in the fixed level order; an
/// absent value contributes nothing, as does a missing numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub kmer_width: usize,
    pub intercept: f64,
    #[serde(default)]
    pub numeric: BTreeMap<String, NumericTerm>,
    #[serde(default)]
    pub categorical: BTreeMap<String, Vec<f64>>,
}

impl LogisticClassifier {
    pub fn validate(&self) -> PolarsResult<()> {
        if self.kmer_width == 0 {
            return Err(PolarsError::ComputeError("logistic model has k-mer width 0".into()));
        }
        for (feature, term) in &self.numeric {
            check_feature(feature, self.kmer_width, false)?;
            if !(term.std.is_finite() && term.std > 0.0) {
                return Err(PolarsError::ComputeError(
                    format!("σ of {} must be positive, got {}", feature, term.std).into(),
                ));
            }
        }
        for (feature, betas) in &self.categorical {
            check_feature(feature, self.kmer_width, true)?;
            let n_levels = Domain::of_column(feature).map(Domain::n_levels).unwrap_or(0);
            if betas.len() != n_levels {
                return Err(PolarsError::ComputeError(
                    format!("{} needs {} level coefficients, got {}", feature, n_levels, betas.len()).into(),
                ));
            }
        }
        Ok(())
    }
}

impl Classifier for LogisticClassifier {
    fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame> {
        let mut lin = Array1::from_elem(features.height(), self.intercept);

        for (feature, term) in &self.numeric {
            if let FeatureView::Numeric(values) = feature_view(features, feature)? {
                for (i, v) in values.into_iter().enumerate() {
                    if let Some(v) = v {
                        lin[i] += term.beta * (v - term.mean) / term.std;
                    }
                }
            }
        }

        for (feature, betas) in &self.categorical {
            if let FeatureView::Categorical(codes) = feature_view(features, feature)? {
                for (i, code) in codes.into_iter().enumerate() {
                    if let Some(beta) = code.and_then(|c| betas.get(c as usize)) {
                        lin[i] += beta;
                    }
                }
            }
        }

        debug!(
            "Applied logistic model to {} rows ({} numeric, {} categorical terms)",
            features.height(),
            self.numeric.len(),
            self.categorical.len()
        );
        probability_frame(lin.mapv(|z| 1.0 / (1.0 + (-z).exp())))
    }

    fn kmer_width(&self) -> Option<usize> {
        Some(self.kmer_width)
    }
}
