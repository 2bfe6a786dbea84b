pub mod domain_report;
pub mod feature_table;
pub mod sequence_encoder;
