use crate::emissions::EmissionsFactorTable;
use crate::models::{CarbonRecord, CarbonReportRow, MergedRecord};
use std::collections::BTreeMap;

pub const MWH_PER_GWH: f64 = 1000.0;

#[derive(Debug, Clone)]
pub struct CarbonEstimate {
    pub records: Vec<CarbonRecord>,
    /// Rows whose production type was not in the table.
    pub fallback_rows: usize,
    pub null_value_rows: usize,
}

pub struct CarbonEstimator {
    table: EmissionsFactorTable,
}

impl CarbonEstimator {
    pub fn new(table: EmissionsFactorTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EmissionsFactorTable {
        &self.table
    }

    pub fn estimate(&self, records: &[MergedRecord]) -> CarbonEstimate {
        let mut fallback_rows = 0;
        let mut null_value_rows = 0;

        let carbon_records: Vec<CarbonRecord> = records
            .iter()
            .map(|record| {
                let (emissions_factor, fell_back) = self.table.resolve(&record.production_type);
                if fell_back {
                    fallback_rows += 1;
                }

                let carbon_kg = record
                    .value_gwh
                    .map(|gwh| gwh * MWH_PER_GWH * emissions_factor);
                if carbon_kg.is_none() {
                    null_value_rows += 1;
                }

                CarbonRecord {
                    record: record.clone(),
                    emissions_factor,
                    carbon_kg,
                }
            })
            .collect();

        if fallback_rows > 0 {
            log::warn!(
                "{} of {} rows used the fallback emissions factor '{}' ({} kg/MWh)",
                fallback_rows,
                records.len(),
                self.table.fallback_key(),
                self.table.fallback_factor()
            );
        }
        if null_value_rows > 0 {
            log::warn!(
                "{} rows have no value_gwh and are left out of monthly totals",
                null_value_rows
            );
        }

        CarbonEstimate {
            records: carbon_records,
            fallback_rows,
            null_value_rows,
        }
    }
}

/// Total emissions per month, ascending. Null `carbon_kg` rows add nothing,
/// rows without a month are skipped.
pub fn monthly_report(records: &[CarbonRecord]) -> Vec<CarbonReportRow> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for record in records {
        let month = record.record.month.as_str();
        if month.is_empty() {
            continue;
        }

        let total = totals.entry(month).or_insert(0.0);
        if let Some(carbon_kg) = record.carbon_kg {
            *total += carbon_kg;
        }
    }

    totals
        .into_iter()
        .map(|(month, carbon_kg)| CarbonReportRow {
            month: month.to_string(),
            carbon_kg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(month: &str, production_type: &str, value: Option<f64>) -> MergedRecord {
        MergedRecord {
            country: "France".to_string(),
            month: month.to_string(),
            balance: None,
            production_type: production_type.to_string(),
            value_gwh: value,
            avg_temp_c: Some(5.0),
            precip_mm: None,
            wind_kmh: None,
        }
    }

    #[test]
    fn test_solar_known_value() {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        let estimate = estimator.estimate(&[record("2023-01", "Solar", Some(100.0))]);

        assert_eq!(estimate.records[0].emissions_factor, 45.0);
        assert_eq!(estimate.records[0].carbon_kg, Some(4_500_000.0));
        assert_eq!(estimate.fallback_rows, 0);
    }

    #[test]
    fn test_unknown_category_uses_fallback() {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        let estimate = estimator.estimate(&[record("2023-01", "Unknown-Category", Some(10.0))]);

        assert_eq!(estimate.records[0].carbon_kg, Some(10.0 * 1000.0 * 300.0));
        assert_eq!(estimate.fallback_rows, 1);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        let records = vec![
            record("2023-01", "Wind", Some(12.5)),
            record("2023-02", "Natural Gas", Some(7.0)),
            record("2023-02", "Mystery", None),
        ];

        let first: Vec<_> = estimator.estimate(&records).records.iter().map(|r| r.carbon_kg).collect();
        let second: Vec<_> = estimator.estimate(&records).records.iter().map(|r| r.carbon_kg).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_monthly_report_matches_row_sums() {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        let records = vec![
            record("2023-02", "Wind", Some(100.0)),
            record("2023-01", "Hydro", Some(50.0)),
            record("2023-02", "Nuclear", Some(3000.0)),
            record("2023-01", "Coal, Peat and Manufactured Gases", Some(20.0)),
        ];
        let estimate = estimator.estimate(&records);
        let report = monthly_report(&estimate.records);

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].month, "2023-01");
        assert_eq!(report[1].month, "2023-02");

        for row in &report {
            let expected: f64 = estimate
                .records
                .iter()
                .filter(|r| r.record.month == row.month)
                .filter_map(|r| r.carbon_kg)
                .sum();
            assert_eq!(row.carbon_kg, expected);
        }
        assert_eq!(report[1].carbon_kg, 100.0 * 1000.0 * 11.0 + 3000.0 * 1000.0 * 12.0);
    }

    #[test]
    fn test_null_values_are_excluded_from_totals() {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        let records = vec![
            record("2023-01", "Solar", Some(1.0)),
            record("2023-01", "Solar", None),
            record("2023-03", "Solar", None),
        ];
        let estimate = estimator.estimate(&records);
        assert_eq!(estimate.null_value_rows, 2);
        assert!(estimate.records[1].carbon_kg.is_none());

        let report = monthly_report(&estimate.records);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].carbon_kg, 45_000.0);
        assert_eq!(report[1].month, "2023-03");
        assert_eq!(report[1].carbon_kg, 0.0);
        assert!(report.iter().all(|r| r.carbon_kg.is_finite()));
    }

    #[test]
    fn test_rows_without_month_are_skipped() {
        let estimator = CarbonEstimator::new(EmissionsFactorTable::canonical());
        let estimate = estimator.estimate(&[record("", "Solar", Some(1.0))]);
        assert!(monthly_report(&estimate.records).is_empty());
    }
}
