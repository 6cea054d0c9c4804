use anyhow::{Context, Result};
use carbon_anomaly::{merge, report, PipelineConfig, SchemaNormalizer};

/// Normalize the raw production and weather tables and write the merged CSV.
pub fn run(config: &PipelineConfig) -> Result<()> {
    println!("🧹 Cleaning inputs for {:?}", config.countries);
    let normalizer = SchemaNormalizer::new(&config.countries);

    let production = normalizer
        .normalize_production_file(&config.production_csv)
        .with_context(|| format!("normalizing production data {}", config.production_csv.display()))?;
    println!("  📊 Production rows: {}", production.len());

    let weather = normalizer
        .normalize_weather_file(&config.weather_csv)
        .with_context(|| format!("normalizing weather data {}", config.weather_csv.display()))?;
    println!("  🌦️  Weather rows: {}", weather.len());

    let merged = merge(&production, &weather);
    report::write_merged_csv(&config.merged_csv, &merged)?;
    println!(
        "  💾 Merged data saved to {}: {} rows",
        config.merged_csv.display(),
        merged.len()
    );

    Ok(())
}
