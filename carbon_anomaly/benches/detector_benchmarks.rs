use carbon_anomaly::{
    AnomalyDetector, CarbonEstimator, DetectorConfig, EmissionsFactorTable, MergedRecord,
    WindowGrouping,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const PRODUCTION_TYPES: [&str; 6] = ["Nuclear", "Hydro", "Wind", "Solar", "Natural Gas", "Other"];

fn synthetic_table(years: usize) -> Vec<MergedRecord> {
    let mut records = Vec::new();
    for year in 0..years {
        for month in 1..=12 {
            for (i, production_type) in PRODUCTION_TYPES.iter().enumerate() {
                let seasonal = if month < 4 || month > 10 { 1.2 } else { 0.9 };
                records.push(MergedRecord {
                    country: "France".to_string(),
                    month: format!("{}-{:02}", 2000 + year, month),
                    balance: Some("Net Electricity Production".to_string()),
                    production_type: production_type.to_string(),
                    value_gwh: Some(1000.0 * (i + 1) as f64 * seasonal),
                    avg_temp_c: Some(12.0),
                    precip_mm: Some(60.0),
                    wind_kmh: Some(20.0),
                });
            }
        }
    }
    records
}

fn benchmark_ungrouped_detection(c: &mut Criterion) {
    let records = synthetic_table(25);

    c.bench_function("detect_ungrouped", |b| {
        let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
        b.iter(|| black_box(detector.detect(&records)));
    });
}

fn benchmark_grouped_detection(c: &mut Criterion) {
    let records = synthetic_table(25);

    c.bench_function("detect_by_production_type", |b| {
        let config = DetectorConfig::default().with_grouping(WindowGrouping::ByProductionType);
        let detector = AnomalyDetector::new(config).unwrap();
        b.iter(|| black_box(detector.detect(&records)));
    });
}

fn benchmark_carbon_estimate(c: &mut Criterion) {
    let records = synthetic_table(25);

    c.bench_function("carbon_estimate", |b| {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        b.iter(|| black_box(estimator.estimate(&records)));
    });
}

criterion_group!(
    benches,
    benchmark_ungrouped_detection,
    benchmark_grouped_detection,
    benchmark_carbon_estimate
);
criterion_main!(benches);
