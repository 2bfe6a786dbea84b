use std::collections::HashMap;

use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifiers::{check_feature, feature_view, probability_frame, Classifier, FeatureView};
use crate::models::Domain;

/// One node of a decision tree. Children always sit after their parent in
/// `Tree::nodes`, the root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// `value <= threshold` goes left.
    Numeric {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        missing_left: bool,
    },
    /// Level codes in `left_levels` go left. Codes follow the fixed level order.
    Categorical {
        feature: String,
        left_levels: Vec<u32>,
        left: usize,
        right: usize,
        #[serde(default)]
        missing_left: bool,
    },
    Leaf {
        positive: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

/// Ensemble of decision trees; the Positive probability of a row is the mean
/// of the leaf values it reaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    pub kmer_width: usize,
    pub trees: Vec<Tree>,
}

impl Tree {
    fn validate(&self, tree: usize, kmer_width: usize) -> PolarsResult<()> {
        let fail = |node: usize, what: String| {
            Err(PolarsError::ComputeError(
                format!("tree {} node {}: {}", tree, node, what).into(),
            ))
        };

        if self.nodes.is_empty() {
            return fail(0, "tree has no nodes".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            let (left, right) = match node {
                Node::Leaf { positive } => {
                    if !(0.0..=1.0).contains(positive) {
                        return fail(idx, format!("leaf probability {} outside [0, 1]", positive));
                    }
                    continue;
                }
                Node::Numeric { feature, threshold, left, right, .. } => {
                    check_feature(feature, kmer_width, false)?;
                    if threshold.is_nan() {
                        return fail(idx, "NaN split threshold".to_string());
                    }
                    (*left, *right)
                }
                Node::Categorical { feature, left_levels, left, right, .. } => {
                    check_feature(feature, kmer_width, true)?;
                    let n_levels = Domain::of_column(feature).map(Domain::n_levels).unwrap_or(0);
                    if let Some(bad) = left_levels.iter().find(|&&l| l as usize >= n_levels) {
                        return fail(idx, format!("level code {} out of range for {}", bad, feature));
                    }
                    (*left, *right)
                }
            };

            for child in [left, right] {
                if child <= idx || child >= self.nodes.len() {
                    return fail(idx, format!("child index {} out of order or range", child));
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, row: usize, views: &HashMap<&str, FeatureView<'_>>) -> PolarsResult<f64> {
        let mut idx = 0;
        loop {
            let node = self.nodes.get(idx).ok_or_else(|| {
                PolarsError::ComputeError(format!("dangling node index {}", idx).into())
            })?;

            let (go_left, left, right) = match node {
                Node::Leaf { positive } => return Ok(*positive),
                Node::Numeric { feature, threshold, left, right, missing_left } => {
                    let value = match views.get(feature.as_str()) {
                        Some(FeatureView::Numeric(ca)) => ca.get(row),
                        _ => None,
                    };
                    (value.map_or(*missing_left, |v| v <= *threshold), *left, *right)
                }
                Node::Categorical { feature, left_levels, left, right, missing_left } => {
                    let code = match views.get(feature.as_str()) {
                        Some(FeatureView::Categorical(ca)) => ca.get(row),
                        _ => None,
                    };
                    (code.map_or(*missing_left, |c| left_levels.contains(&c)), *left, *right)
                }
            };

            let next = if go_left { left } else { right };
            if next <= idx {
                return Err(PolarsError::ComputeError(
                    format!("tree cycles back from node {} to {}", idx, next).into(),
                ));
            }
            idx = next;
        }
    }

    fn features(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Numeric { feature, .. } | Node::Categorical { feature, .. } => Some(feature.as_str()),
            Node::Leaf { .. } => None,
        })
    }
}

impl ForestClassifier {
    pub fn validate(&self) -> PolarsResult<()> {
        if self.kmer_width == 0 {
            return Err(PolarsError::ComputeError("forest has k-mer width 0".into()));
        }
        if self.trees.is_empty() {
            return Err(PolarsError::ComputeError("forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.kmer_width)?;
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn predict_proba(&self, features: &DataFrame) -> PolarsResult<DataFrame> {
        let n = features.height();

        let mut views: HashMap<&str, FeatureView<'_>> = HashMap::new();
        for tree in &self.trees {
            for feature in tree.features() {
                if !views.contains_key(feature) {
                    views.insert(feature, feature_view(features, feature)?);
                }
            }
        }
        debug!("Scoring {} rows with {} trees over {} features", n, self.trees.len(), views.len());

        let mut positive = Array1::<f64>::zeros(n);
        for tree in &self.trees {
            for row in 0..n {
                positive[row] += tree.leaf_value(row, &views)?;
            }
        }
        if !self.trees.is_empty() {
            positive /= self.trees.len() as f64;
        }

        probability_frame(positive)
    }

    fn kmer_width(&self) -> Option<usize> {
        Some(self.kmer_width)
    }
}
