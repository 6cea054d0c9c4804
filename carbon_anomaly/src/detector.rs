use crate::error::Result;
use crate::models::{AnomalyRecord, DetectorConfig, MergedRecord, WindowGrouping};
use rayon::prelude::*;
use std::collections::HashMap;

pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Rows whose rolling z-score exceeds the threshold, in input order.
    pub fn detect(&self, records: &[MergedRecord]) -> Vec<AnomalyRecord> {
        let anomalies: Vec<_> = self
            .score(records)
            .into_iter()
            .filter(|r| r.anomaly)
            .collect();

        log::info!(
            "Flagged {} of {} rows (window={}, threshold={}, grouping={:?})",
            anomalies.len(),
            records.len(),
            self.config.window,
            self.config.threshold,
            self.config.grouping
        );

        anomalies
    }

    /// Every row with its rolling z-score and anomaly flag.
    pub fn score(&self, records: &[MergedRecord]) -> Vec<AnomalyRecord> {
        let mut zscores = vec![None; records.len()];

        for group in self.window_groups(records) {
            let values: Vec<Option<f64>> = group.iter().map(|&i| records[i].value_gwh).collect();
            let group_scores = self.rolling_zscores(&values);

            for (&idx, zscore) in group.iter().zip(group_scores) {
                zscores[idx] = zscore;
            }
        }

        records
            .iter()
            .zip(zscores)
            .map(|(record, zscore)| AnomalyRecord {
                record: record.clone(),
                zscore,
                anomaly: zscore.map_or(false, |z| z.abs() > self.config.threshold),
            })
            .collect()
    }

    /// Row indices sharing a window, each list in input order.
    fn window_groups(&self, records: &[MergedRecord]) -> Vec<Vec<usize>> {
        match self.config.grouping {
            WindowGrouping::Ungrouped => vec![(0..records.len()).collect()],
            WindowGrouping::ByProductionType => {
                let mut order: Vec<&str> = Vec::new();
                let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();

                for (idx, record) in records.iter().enumerate() {
                    let key = record.production_type.as_str();
                    groups
                        .entry(key)
                        .or_insert_with(|| {
                            order.push(key);
                            Vec::new()
                        })
                        .push(idx);
                }

                order
                    .into_iter()
                    .filter_map(|key| groups.remove(key))
                    .collect()
            }
        }
    }

    /// Indexed parallel map, so the output order matches a sequential scan.
    fn rolling_zscores(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let window = self.config.window;
        (0..values.len())
            .into_par_iter()
            .map(|pos| trailing_zscore(values, pos, window))
            .collect()
    }
}

/// z-score of `values[pos]` against the trailing window ending at `pos`.
/// Undefined for a short window, a null inside it, or zero spread.
fn trailing_zscore(values: &[Option<f64>], pos: usize, window: usize) -> Option<f64> {
    if window < 2 || pos + 1 < window {
        return None;
    }

    let slice = &values[pos + 1 - window..=pos];
    let observed: Option<Vec<f64>> = slice.iter().copied().collect();
    let observed = observed?;

    // A flat window has zero spread even when the two-pass sum rounds.
    if observed.iter().all(|v| *v == observed[0]) {
        return None;
    }

    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let variance = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();

    if std == 0.0 || !std.is_finite() {
        return None;
    }

    let zscore = (observed[observed.len() - 1] - mean) / std;
    zscore.is_finite().then_some(zscore)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(production_type: &str, month: &str, value: Option<f64>) -> MergedRecord {
        MergedRecord {
            country: "France".to_string(),
            month: month.to_string(),
            balance: Some("Net Electricity Production".to_string()),
            production_type: production_type.to_string(),
            value_gwh: value,
            avg_temp_c: None,
            precip_mm: None,
            wind_kmh: None,
        }
    }

    fn series(values: &[f64]) -> Vec<MergedRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| record("Nuclear", &format!("2023-{:02}", i % 12 + 1), Some(*v)))
            .collect()
    }

    #[test]
    fn test_short_input_yields_no_anomalies() {
        let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
        let records = series(&[1.0, 2.0, 3.0, 1000.0, 5.0]);

        assert!(detector.detect(&records).is_empty());
        assert!(detector.score(&records).iter().all(|r| r.zscore.is_none()));
    }

    #[test]
    fn test_outlier_after_constant_run_is_flagged() {
        let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
        let mut values = vec![10.0; 11];
        values.push(1000.0);

        let anomalies = detector.detect(&series(&values));
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].record.value_gwh, Some(1000.0));
        assert_eq!(anomalies[0].record.month, "2023-12");

        // One outlier in a full window always scores (n - 1) / sqrt(n).
        let expected = 11.0 / 12.0_f64.sqrt();
        let zscore = anomalies[0].zscore.unwrap();
        assert!((zscore - expected).abs() < 1e-9);
        assert!(anomalies[0].anomaly);
    }

    #[test]
    fn test_constant_series_is_never_flagged() {
        let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();
        let scored = detector.score(&series(&[42.0; 24]));

        assert!(scored.iter().all(|r| r.zscore.is_none() && !r.anomaly));
    }

    #[test]
    fn test_flat_window_of_inexact_values_has_no_score() {
        let values = vec![Some(0.1); 12];
        assert_eq!(trailing_zscore(&values, 11, 12), None);

        let detector = AnomalyDetector::new(DetectorConfig::new(12, 0.5)).unwrap();
        let scored = detector.score(&series(&[0.1; 24]));
        assert!(scored.iter().all(|r| r.zscore.is_none() && !r.anomaly));
    }

    #[test]
    fn test_null_inside_window_leaves_score_undefined() {
        let detector = AnomalyDetector::new(DetectorConfig::new(3, 1.0)).unwrap();
        let records = vec![
            record("Wind", "2023-01", Some(1.0)),
            record("Wind", "2023-02", None),
            record("Wind", "2023-03", Some(3.0)),
            record("Wind", "2023-04", Some(4.0)),
            record("Wind", "2023-05", Some(9.0)),
        ];

        let scored = detector.score(&records);
        assert!(scored[2].zscore.is_none());
        assert!(scored[3].zscore.is_none());
        assert!(scored[4].zscore.is_some());
    }

    #[test]
    fn test_window_of_one_is_undefined() {
        let detector = AnomalyDetector::new(DetectorConfig::new(1, 0.5)).unwrap();
        assert!(detector.detect(&series(&[1.0, 100.0, 1.0])).is_empty());
    }

    #[test]
    fn test_ungrouped_window_mixes_production_types() {
        // Alternating magnitudes: in one shared window the large values
        // dominate the spread, per type each series is flat.
        let mut records = Vec::new();
        for month in 1..=6 {
            let m = format!("2023-{:02}", month);
            records.push(record("Nuclear", &m, Some(30000.0)));
            records.push(record("Solar", &m, Some(1000.0)));
        }
        records.push(record("Solar", "2023-07", Some(5000.0)));

        let ungrouped = AnomalyDetector::new(DetectorConfig::new(4, 1.0)).unwrap();
        let grouped = AnomalyDetector::new(
            DetectorConfig::new(4, 1.0).with_grouping(WindowGrouping::ByProductionType),
        )
        .unwrap();

        let ungrouped_scores = ungrouped.score(&records);
        assert!(ungrouped_scores[3].zscore.is_some());

        let grouped_scores = grouped.score(&records);
        // Fourth Solar row is index 7; its window is four flat Solar values.
        assert!(grouped_scores[7].zscore.is_none());
        let last = grouped_scores.last().unwrap();
        assert!(last.anomaly);
        assert_eq!(last.record.production_type, "Solar");
    }

    #[test]
    fn test_grouped_output_keeps_input_order() {
        let detector = AnomalyDetector::new(
            DetectorConfig::new(3, 1.0).with_grouping(WindowGrouping::ByProductionType),
        )
        .unwrap();
        let records = vec![
            record("Hydro", "2023-01", Some(1.0)),
            record("Wind", "2023-01", Some(5.0)),
            record("Hydro", "2023-02", Some(2.0)),
            record("Wind", "2023-02", Some(6.0)),
        ];

        let scored = detector.score(&records);
        let types: Vec<_> = scored.iter().map(|r| r.record.production_type.as_str()).collect();
        assert_eq!(types, vec!["Hydro", "Wind", "Hydro", "Wind"]);
    }

    #[test]
    fn test_parallel_scan_matches_sequential() {
        let values: Vec<Option<f64>> = (0..500)
            .map(|i| Some(((i * 37) % 101) as f64 + if i % 97 == 0 { 500.0 } else { 0.0 }))
            .collect();
        let detector = AnomalyDetector::new(DetectorConfig::default()).unwrap();

        let parallel = detector.rolling_zscores(&values);
        let sequential: Vec<_> = (0..values.len())
            .map(|pos| trailing_zscore(&values, pos, 12))
            .collect();

        assert_eq!(parallel, sequential);
    }
}
