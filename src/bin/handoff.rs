use anyhow::{bail, Context, Result};
use handoff::{run_handoff_files, HandoffConfig};
use std::path::PathBuf;

const USAGE: &str = "usage: handoff <input.csv> <output.csv> [diagnostics_dir]";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        bail!(USAGE);
    }

    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);
    let diagnostics_dir = args.get(2).map(PathBuf::from);

    let run = run_handoff_files(
        &input,
        &output,
        diagnostics_dir.as_deref(),
        HandoffConfig::default(),
    )
    .with_context(|| format!("handoff estimation failed for {}", input.display()))?;

    for failure in &run.failures {
        log::error!("{} {}: {}", failure.window, failure.band, failure.error);
    }

    println!(
        "{} handoff coefficients written to {}",
        run.coefficients.len(),
        output.display()
    );
    Ok(())
}
