use crate::emissions::{EmissionsFactorTable, FALLBACK_KEY};
use crate::error::Result;
use crate::models::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub countries: Vec<String>,

    // Inputs
    pub production_csv: PathBuf,
    pub weather_csv: PathBuf,

    // Outputs
    pub merged_csv: PathBuf,
    pub anomalies_csv: PathBuf,
    pub carbon_report_csv: PathBuf,
    pub store_dir: PathBuf,
    pub export_dir: PathBuf,
    pub plots_dir: PathBuf,

    pub detector: DetectorConfig,

    /// `production_type,factor` CSV replacing the canonical table.
    pub emissions_factors_csv: Option<PathBuf>,
    pub fallback_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let output = PathBuf::from("data/output");
        Self {
            countries: vec!["France".to_string()],
            production_csv: PathBuf::from("IEA_France_2023_2025.csv"),
            weather_csv: output.join("weather_data.csv"),
            merged_csv: output.join("merged_data.csv"),
            anomalies_csv: output.join("anomalies.csv"),
            carbon_report_csv: output.join("carbon_report.csv"),
            store_dir: output.join("store"),
            export_dir: PathBuf::from("tableau_exports"),
            plots_dir: PathBuf::from("plots"),
            detector: DetectorConfig::default(),
            emissions_factors_csv: None,
            fallback_key: FALLBACK_KEY.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config; absent keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.detector.validate()?;
        Ok(config)
    }

    pub fn emissions_table(&self) -> Result<EmissionsFactorTable> {
        match &self.emissions_factors_csv {
            Some(path) => EmissionsFactorTable::from_csv(path, &self.fallback_key),
            None => Ok(EmissionsFactorTable::canonical()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WindowGrouping;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{ "countries": ["France", "Spain"], "detector": { "grouping": "by_production_type" } }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.countries, vec!["France", "Spain"]);
        assert_eq!(config.detector.window, 12);
        assert_eq!(config.detector.grouping, WindowGrouping::ByProductionType);
        assert_eq!(config.merged_csv, PathBuf::from("data/output/merged_data.csv"));
    }

    #[test]
    fn test_invalid_detector_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "detector": { "window": 0 } }"#).unwrap();

        assert!(PipelineConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_default_emissions_table_is_canonical() {
        let table = PipelineConfig::default().emissions_table().unwrap();
        assert_eq!(table.get("Solar"), Some(45.0));
    }
}
