pub mod carbon;
pub mod config;
pub mod detector;
pub mod emissions;
pub mod error;
pub mod merger;
pub mod models;
pub mod normalizer;
pub mod report;
pub mod store;

pub use carbon::{monthly_report, CarbonEstimate, CarbonEstimator};
pub use config::PipelineConfig;
pub use detector::AnomalyDetector;
pub use emissions::EmissionsFactorTable;
pub use error::{PipelineError, Result};
pub use merger::merge;
pub use models::{
    AnomalyRecord, CarbonRecord, CarbonReportRow, DetectorConfig, MergedRecord, Observation,
    WeatherObservation, WindowGrouping,
};
pub use normalizer::SchemaNormalizer;
pub use store::{export_reports, ReportStore};
