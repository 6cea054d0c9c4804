use anyhow::{Context, Result};
use carbon_anomaly::{
    monthly_report, report, AnomalyDetector, CarbonEstimator, DetectorConfig,
    EmissionsFactorTable, WindowGrouping,
};
use clap::{Parser, ValueEnum};
use log::info;
use serde_json::json;
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "carbon_anomaly")]
#[command(about = "Flag anomalous consumption and estimate monthly carbon emissions")]
struct Args {
    /// Merged production + weather CSV
    #[arg(short, long, default_value = "data/output/merged_data.csv")]
    merged: String,

    /// Rolling window length in rows
    #[arg(short, long, default_value = "12")]
    window: usize,

    /// Absolute z-score above which a row is anomalous
    #[arg(short, long, default_value = "3.0")]
    threshold: f64,

    /// Which rows share a rolling window
    #[arg(short, long, value_enum, default_value = "none")]
    grouping: Grouping,

    /// Emissions factor override CSV (production_type,factor)
    #[arg(long)]
    factors: Option<String>,

    /// Fallback key in the emissions factor table
    #[arg(long, default_value = "Electricity")]
    fallback_key: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    output: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum Grouping {
    None,
    ProductionType,
}

impl From<Grouping> for WindowGrouping {
    fn from(grouping: Grouping) -> Self {
        match grouping {
            Grouping::None => WindowGrouping::Ungrouped,
            Grouping::ProductionType => WindowGrouping::ByProductionType,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Loading merged table from {}", args.merged);
    let records = report::read_merged_csv(&args.merged)
        .with_context(|| format!("reading merged table {}", args.merged))?;
    info!("Loaded {} rows", records.len());

    let config = DetectorConfig::new(args.window, args.threshold).with_grouping(args.grouping.into());
    let detector = AnomalyDetector::new(config)?;
    let anomalies = detector.detect(&records);

    let table = match &args.factors {
        Some(path) => EmissionsFactorTable::from_csv(path, &args.fallback_key)
            .with_context(|| format!("loading emissions factors from {}", path))?,
        None => EmissionsFactorTable::canonical(),
    };
    let estimator = CarbonEstimator::new(table);
    let estimate = estimator.estimate(&records);
    let carbon_report = monthly_report(&estimate.records);

    match args.output {
        OutputFormat::Json => {
            let output = json!({
                "anomalies": anomalies,
                "carbon_report": carbon_report,
                "fallback_rows": estimate.fallback_rows,
                "null_value_rows": estimate.null_value_rows,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Csv => {
            report::write_carbon_report(std::io::stdout().lock(), &carbon_report)?;
        }
        OutputFormat::Summary => {
            println!("Carbon & Anomaly Summary");
            println!("========================");
            println!("Rows analysed: {}", records.len());
            println!(
                "Window: {} rows, threshold: {:.1}, grouping: {:?}",
                detector.config().window,
                detector.config().threshold,
                detector.config().grouping
            );
            println!("Anomalies flagged: {}", anomalies.len());

            let mut by_type: HashMap<&str, usize> = HashMap::new();
            for anomaly in &anomalies {
                *by_type.entry(anomaly.record.production_type.as_str()).or_insert(0) += 1;
            }
            let mut by_type: Vec<_> = by_type.into_iter().collect();
            by_type.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            for (production_type, count) in by_type {
                println!("  {}: {}", production_type, count);
            }

            println!();
            println!(
                "Fallback factor used for {} rows, {} rows without a value",
                estimate.fallback_rows, estimate.null_value_rows
            );
            println!("Monthly emissions (tonnes CO2e):");
            for row in &carbon_report {
                println!("  {}: {:.1}", row.month, row.carbon_kg / 1000.0);
            }
        }
    }

    Ok(())
}
