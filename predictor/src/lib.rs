//! m6A methylation prediction for candidate RNA sites.
//!
//! Per-site features (GC content, RNA type and region, exon length, distance
//! to the nearest junction, conservation and the surrounding k-mer) are
//! encoded into the fixed schema a pre-trained classifier expects, scored,
//! and thresholded into Positive / Negative calls.
//!
//! ```ignore
//! use m6a_predictor::{load_classifier, predict_batch, read_csv, DEFAULT_THRESHOLD};
//!
//! let classifier = load_classifier("m6a_forest.json")?;
//! let sites = read_csv("sites.csv")?;
//! let predicted = predict_batch(&classifier, &sites, DEFAULT_THRESHOLD)?;
//! ```

pub mod classifiers;
pub mod cli;
pub mod data_handling;
pub mod helper_functions;
pub mod models;
pub mod prediction_tools;

pub use classifiers::{load_classifier, Classifier, ForestClassifier, LogisticClassifier, ModelArtifact};
pub use data_handling::domain_report::{check_domains, DomainReport, DomainViolation};
pub use data_handling::feature_table::{check_schema, prepare_features};
pub use data_handling::sequence_encoder::encode_sequences;
pub use helper_functions::{dataframe_to_csv, read_csv};
pub use models::{
    feature_frame, FeatureRecord, M6aStatus, Nucleotide, RnaRegion, RnaType, DEFAULT_THRESHOLD,
};
pub use prediction_tools::batch_predictor::predict_batch;
pub use prediction_tools::single_predictor::{predict_one, predict_record};
