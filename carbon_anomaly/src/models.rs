use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One row of a production/consumption series after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub country: String,
    pub month: String, // YYYY-MM
    pub balance: Option<String>,
    pub production_type: String,
    pub value_gwh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub country: String,
    pub month: String,
    pub avg_temp_c: Option<f64>,
    pub precip_mm: Option<f64>,
    pub wind_kmh: Option<f64>,
}

/// Production row left-joined with its weather row. Field order is the
/// column order of the merged CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub country: String,
    pub month: String,
    #[serde(rename = "Balance", default)]
    pub balance: Option<String>,
    pub production_type: String,
    #[serde(default)]
    pub value_gwh: Option<f64>,
    #[serde(default)]
    pub avg_temp_c: Option<f64>,
    #[serde(default)]
    pub precip_mm: Option<f64>,
    #[serde(default)]
    pub wind_kmh: Option<f64>,
}

impl MergedRecord {
    pub fn new(observation: Observation, weather: Option<&WeatherObservation>) -> Self {
        Self {
            country: observation.country,
            month: observation.month,
            balance: observation.balance,
            production_type: observation.production_type,
            value_gwh: observation.value_gwh,
            avg_temp_c: weather.and_then(|w| w.avg_temp_c),
            precip_mm: weather.and_then(|w| w.precip_mm),
            wind_kmh: weather.and_then(|w| w.wind_kmh),
        }
    }
}

impl From<Observation> for MergedRecord {
    fn from(observation: Observation) -> Self {
        Self::new(observation, None)
    }
}

/// Which rows share a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowGrouping {
    /// One window over the whole table in input order. This mixes the
    /// magnitudes of different production types and is kept as the default
    /// because it is what the reports have always been computed with.
    #[default]
    Ungrouped,
    /// A separate window per production type.
    ByProductionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub window: usize,
    pub threshold: f64,
    pub grouping: WindowGrouping,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: 12,
            threshold: 3.0,
            grouping: WindowGrouping::Ungrouped,
        }
    }
}

impl DetectorConfig {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self {
            window,
            threshold,
            ..Self::default()
        }
    }

    pub fn with_grouping(mut self, grouping: WindowGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(PipelineError::InvalidConfig(
                "window must be a positive number of rows".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold must be positive, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub record: MergedRecord,
    pub zscore: Option<f64>,
    pub anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonRecord {
    pub record: MergedRecord,
    pub emissions_factor: f64, // kg CO2e per MWh
    pub carbon_kg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonReportRow {
    pub month: String,
    pub carbon_kg: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_config_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.window, 12);
        assert_eq!(config.threshold, 3.0);
        assert_eq!(config.grouping, WindowGrouping::Ungrouped);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_detector_config_rejects_bad_parameters() {
        assert!(DetectorConfig::new(0, 3.0).validate().is_err());
        assert!(DetectorConfig::new(12, 0.0).validate().is_err());
        assert!(DetectorConfig::new(12, -1.0).validate().is_err());
        assert!(DetectorConfig::new(12, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_merged_record_without_weather() {
        let observation = Observation {
            country: "France".to_string(),
            month: "2023-01".to_string(),
            balance: None,
            production_type: "Solar".to_string(),
            value_gwh: Some(100.0),
        };
        let merged = MergedRecord::from(observation);
        assert_eq!(merged.value_gwh, Some(100.0));
        assert!(merged.avg_temp_c.is_none());
        assert!(merged.precip_mm.is_none());
        assert!(merged.wind_kmh.is_none());
    }
}
