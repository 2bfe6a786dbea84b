use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use m6a_predictor::cli::Args;
use m6a_predictor::{check_domains, dataframe_to_csv, load_classifier, predict_batch, read_csv};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let start = std::time::Instant::now();
    let args = Args::parse();
    args.check()?;

    run(&args)?;

    info!("Elapsed time: {:.3?}", start.elapsed());
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let classifier = load_classifier(&args.model)
        .with_context(|| format!("could not load model {}", args.model.display()))?;

    let sites = read_csv(&args.input)
        .with_context(|| format!("could not read feature table {}", args.input.display()))?;
    info!("Read {} candidate sites from {}", sites.height(), args.input.display());

    if args.strict_domains {
        let report = check_domains(&sites)?;
        if !report.is_clean() {
            bail!("out-of-domain categorical values:\n{}", report);
        }
    }

    let mut predicted = predict_batch(classifier.as_ref(), &sites, args.threshold)?;
    dataframe_to_csv(&mut predicted, &args.output, true)
        .with_context(|| format!("could not write predictions to {}", args.output.display()))?;

    Ok(())
}
