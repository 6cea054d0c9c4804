use anyhow::{Context, Result};
use carbon_anomaly::{
    export_reports, monthly_report, report, AnomalyDetector, CarbonEstimator, PipelineConfig,
    ReportStore,
};

/// Anomaly detection and carbon tracking over the merged table, then store
/// and export the reports.
pub fn run(config: &PipelineConfig) -> Result<()> {
    let records = report::read_merged_csv(&config.merged_csv)
        .with_context(|| format!("reading {}", config.merged_csv.display()))?;
    println!("📥 Loaded {} merged rows", records.len());

    let detector = AnomalyDetector::new(config.detector.clone())?;
    let anomalies = detector.detect(&records);
    report::write_anomalies_csv(&config.anomalies_csv, &anomalies)?;
    println!(
        "🔍 Anomalies saved to {}: {} records",
        config.anomalies_csv.display(),
        anomalies.len()
    );

    let estimator = CarbonEstimator::new(config.emissions_table()?);
    let estimate = estimator.estimate(&records);
    let carbon_report = monthly_report(&estimate.records);
    report::write_carbon_report_csv(&config.carbon_report_csv, &carbon_report)?;
    println!(
        "🌍 Carbon report saved to {}: {} months",
        config.carbon_report_csv.display(),
        carbon_report.len()
    );
    if estimate.fallback_rows > 0 {
        println!(
            "  ⚠️  {} rows used the fallback emissions factor",
            estimate.fallback_rows
        );
    }

    let store = ReportStore::new(&config.store_dir)?;
    store.save_merged(&records)?;
    store.save_anomalies(&anomalies)?;
    store.save_carbon_report(&carbon_report)?;
    println!("📦 Reports stored in {}", config.store_dir.display());

    let exported = export_reports(
        &[
            config.merged_csv.clone(),
            config.anomalies_csv.clone(),
            config.carbon_report_csv.clone(),
        ],
        &config.export_dir,
    )?;
    println!(
        "📤 Exported {} files to {}",
        exported.len(),
        config.export_dir.display()
    );

    Ok(())
}
