pub mod batch_predictor;
pub mod single_predictor;
