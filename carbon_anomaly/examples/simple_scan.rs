use carbon_anomaly::{
    monthly_report, AnomalyDetector, CarbonEstimator, DetectorConfig, EmissionsFactorTable,
    MergedRecord,
};

fn main() {
    // One year of flat nuclear output, then a month with a metering spike
    let mut records: Vec<MergedRecord> = (1..=12)
        .map(|month| MergedRecord {
            country: "France".to_string(),
            month: format!("2023-{:02}", month),
            balance: Some("Net Electricity Production".to_string()),
            production_type: "Nuclear".to_string(),
            value_gwh: Some(28_000.0 + (month % 3) as f64 * 150.0),
            avg_temp_c: None,
            precip_mm: None,
            wind_kmh: None,
        })
        .collect();
    records.push(MergedRecord {
        month: "2024-01".to_string(),
        value_gwh: Some(45_000.0),
        ..records[0].clone()
    });

    let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
    let anomalies = detector.detect(&records);

    println!("Anomaly Scan");
    println!("============");
    for anomaly in &anomalies {
        println!(
            "  {} {}: {:.0} GWh (z = {:.2})",
            anomaly.record.month,
            anomaly.record.production_type,
            anomaly.record.value_gwh.unwrap_or_default(),
            anomaly.zscore.unwrap_or_default()
        );
    }
    if anomalies.is_empty() {
        println!("  No anomalies found");
    }

    let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
    let estimate = estimator.estimate(&records);

    println!();
    println!("Monthly Emissions");
    println!("=================");
    for row in monthly_report(&estimate.records) {
        println!("  {}: {:.1} t CO2e", row.month, row.carbon_kg / 1000.0);
    }
}
