//! The pre-trained classifier seen as a capability: features in, class
//! probabilities out.
//!
//! Persisted models are JSON documents tagged by `model_type`. They are read
//! once with [`load_classifier`], validated against the trained feature schema
//! and handed out as an immutable, shareable handle.

use std::path::Path;
use std::sync::Arc;

use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data_handling::feature_table::feature_columns;
use crate::models::{polars_err, Domain, M6aStatus};

pub mod forest;
pub mod logistic;

pub use forest::{ForestClassifier, Node, Tree};
pub use logistic::{LogisticClassifier, NumericTerm};

/// A fitted model that scores prepared feature tables.
///
/// `features` holds `Float64` numeric columns and `UInt32` level codes for
/// categorical ones (null = absent). The returned frame has one `Float64`
/// column per class, named `Positive` and `Negative`, row-aligned with the
/// input.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame>;

    /// Sequence width the model was trained on, when it knows it.
    fn kmer_width(&self) -> Option<usize> {
        None
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame> {
        (**self).predict_proba(features)
    }

    fn kmer_width(&self) -> Option<usize> {
        (**self).kmer_width()
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame> {
        (**self).predict_proba(features)
    }

    fn kmer_width(&self) -> Option<usize> {
        (**self).kmer_width()
    }
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame> {
        (**self).predict_proba(features)
    }

    fn kmer_width(&self) -> Option<usize> {
        (**self).kmer_width()
    }
}

/// Class-probability frame from the Positive mass of each row.
pub fn probability_frame(positive: Array1<f64>) -> PolarsResult<DataFrame> {
    let negative = positive.mapv(|p| 1.0 - p);
    DataFrame::new(vec![
        Column::new(M6aStatus::POSITIVE.into(), positive.to_vec()),
        Column::new(M6aStatus::NEGATIVE.into(), negative.to_vec()),
    ])
}

// ─── Feature access ─────────────────────────────────────────────────────────

/// Typed view on one prepared feature column.
pub(crate) enum FeatureView<'a> {
    Numeric(&'a Float64Chunked),
    Categorical(&'a UInt32Chunked),
}

pub(crate) fn feature_view<'a>(features: &'a DataFrame, name: &str) -> PolarsResult<FeatureView<'a>> {
    let column = features.column(name)?;
    if Domain::of_column(name).is_some() {
        Ok(FeatureView::Categorical(column.u32()?))
    } else {
        Ok(FeatureView::Numeric(column.f64()?))
    }
}

/// Checks that `feature` exists in the trained schema of width `kmer_width`
/// and is of the expected kind.
pub(crate) fn check_feature(feature: &str, kmer_width: usize, categorical: bool) -> PolarsResult<()> {
    if !feature_columns(kmer_width).iter().any(|f| f == feature) {
        return Err(PolarsError::ComputeError(
            format!("model refers to unknown feature '{}'", feature).into(),
        ));
    }
    if Domain::of_column(feature).is_some() != categorical {
        let kind = if categorical { "categorical" } else { "numeric" };
        return Err(PolarsError::ComputeError(
            format!("model uses '{}' as a {} feature", feature, kind).into(),
        ));
    }
    Ok(())
}

// ─── Persisted models ───────────────────────────────────────────────────────

/// On-disk form of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelArtifact {
    Forest(ForestClassifier),
    Logistic(LogisticClassifier),
}

impl ModelArtifact {
    pub fn validate(&self) -> PolarsResult<()> {
        match self {
            ModelArtifact::Forest(m) => m.validate(),
            ModelArtifact::Logistic(m) => m.validate(),
        }
    }

    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        match self {
            ModelArtifact::Forest(m) => Arc::new(m),
            ModelArtifact::Logistic(m) => Arc::new(m),
        }
    }

    pub fn from_json(json: &str) -> PolarsResult<ModelArtifact> {
        let artifact: ModelArtifact =
            serde_json::from_str(json).map_err(|e| polars_err(Box::new(e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PolarsResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| polars_err(Box::new(e)))?;
        std::fs::write(path.as_ref(), json).map_err(|e| polars_err(Box::new(e)))?;
        debug!("Saved model to {}", path.as_ref().display());
        Ok(())
    }
}

/// Reads and validates a persisted model.
pub fn load_classifier(path: impl AsRef<Path>) -> PolarsResult<Arc<dyn Classifier>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        PolarsError::ComputeError(format!("Failed to read model {}: {}", path.display(), e).into())
    })?;
    let artifact = ModelArtifact::from_json(&json)?;

    match &artifact {
        ModelArtifact::Forest(m) => info!(
            "Loaded forest of {} trees (k-mer width {}) from {}",
            m.trees.len(),
            m.kmer_width,
            path.display()
        ),
        ModelArtifact::Logistic(m) => info!(
            "Loaded logistic model with {} numeric and {} categorical terms (k-mer width {}) from {}",
            m.numeric.len(),
            m.categorical.len(),
            m.kmer_width,
            path.display()
        ),
    }

    Ok(artifact.into_classifier())
}
