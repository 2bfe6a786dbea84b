use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::models::DEFAULT_THRESHOLD;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Predict m6A methylation status of candidate RNA sites with a pre-trained model",
    long_about = None
)]
pub struct Args {
    #[arg(
        short = 'm',
        long = "model",
        env = "M6A_MODEL",
        value_name = "PATH",
        help = "Path to the trained model (JSON artifact)"
    )]
    pub model: PathBuf,

    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "PATH",
        help = "CSV with gc_content, RNA_type, RNA_region, exon_length, distance_to_junction, evolutionary_conservation and DNA_5mer columns"
    )]
    pub input: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        default_value = "m6a_predictions.csv",
        help = "Where to write the input table with the prediction columns appended"
    )]
    pub output: PathBuf,

    #[arg(
        short = 't',
        long = "threshold",
        env = "M6A_THRESHOLD",
        value_name = "FLOAT",
        default_value_t = DEFAULT_THRESHOLD,
        help = "Sites with a probability strictly above this are called Positive"
    )]
    pub threshold: f64,

    #[arg(
        long = "strict-domains",
        help = "Fail instead of warning when a categorical value is outside its domain"
    )]
    pub strict_domains: bool,
}

impl Args {
    pub fn check(&self) -> Result<()> {
        if !self.model.is_file() {
            bail!("model file {} does not exist", self.model.display());
        }
        if !self.input.is_file() {
            bail!("input file {} does not exist", self.input.display());
        }
        if self.threshold.is_nan() {
            bail!("threshold must be a number");
        }
        Ok(())
    }
}
