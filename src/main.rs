use anyhow::{Context, Result};
use carbon_anomaly::PipelineConfig;
use std::path::{Path, PathBuf};

mod clean_transform;
mod pipeline;
mod reporting;
mod visualization;

use pipeline::PipelineRunner;

const DEFAULT_CONFIG: &str = "pipeline.json";

fn load_config(args: &[String]) -> Result<PipelineConfig> {
    let explicit = args
        .iter()
        .position(|a| a == "--config")
        .map(|i| {
            args.get(i + 1)
                .map(PathBuf::from)
                .context("--config needs a path")
        })
        .transpose()?;

    match explicit {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => PipelineConfig::from_file(DEFAULT_CONFIG)
            .with_context(|| format!("loading config {}", DEFAULT_CONFIG)),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    // Set Rayon to use all available cores
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()?;

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(&args)?;
    let has = |flag: &str| args.iter().any(|a| a == flag);

    let runner = if has("--clean") {
        PipelineRunner::new().step("Ingestion & Transformation", clean_transform::run)
    } else if has("--report") {
        PipelineRunner::new().step("Reporting", reporting::run)
    } else if has("--viz") {
        PipelineRunner::new().step("Visualization", visualization::run)
    } else {
        PipelineRunner::new()
            .step("Ingestion & Transformation", clean_transform::run)
            .step("Reporting", reporting::run)
            .step("Visualization", visualization::run)
    };

    println!("🚀 Green Power Pipeline");
    println!("Using {} CPU cores", num_cpus::get());
    println!("Countries: {:?}", config.countries);
    println!("Steps: {}", runner.step_names().join(" → "));
    println!("{}", "=".repeat(60));

    let start = std::time::Instant::now();
    runner.run(&config)?;
    println!("\n✅ All pipeline steps completed in {:?}", start.elapsed());

    Ok(())
}
