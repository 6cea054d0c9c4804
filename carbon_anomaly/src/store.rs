use crate::error::Result;
use crate::models::{AnomalyRecord, CarbonReportRow, MergedRecord};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable copies of the report tables, one Parquet file per table.
pub struct ReportStore {
    store_dir: PathBuf,
}

impl ReportStore {
    pub fn new<P: AsRef<Path>>(store_dir: P) -> Result<Self> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir)?;
        Ok(Self { store_dir })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.store_dir.join(format!("{}.parquet", table))
    }

    pub fn save_merged(&self, records: &[MergedRecord]) -> Result<PathBuf> {
        let mut df = merged_frame(records)?;
        self.write_table("merged", &mut df)
    }

    pub fn save_anomalies(&self, anomalies: &[AnomalyRecord]) -> Result<PathBuf> {
        let records: Vec<MergedRecord> = anomalies.iter().map(|a| a.record.clone()).collect();
        let mut df = merged_frame(&records)?;
        let zscores: Vec<Option<f64>> = anomalies.iter().map(|a| a.zscore).collect();
        let flags: Vec<bool> = anomalies.iter().map(|a| a.anomaly).collect();
        df.with_column(Series::new("zscore".into(), zscores))?;
        df.with_column(Series::new("anomaly".into(), flags))?;
        self.write_table("anomalies", &mut df)
    }

    pub fn save_carbon_report(&self, report: &[CarbonReportRow]) -> Result<PathBuf> {
        let months: Vec<&str> = report.iter().map(|r| r.month.as_str()).collect();
        let totals: Vec<f64> = report.iter().map(|r| r.carbon_kg).collect();
        let mut df = df!(
            "month" => months,
            "carbon_kg" => totals
        )?;
        self.write_table("carbon_report", &mut df)
    }

    fn write_table(&self, table: &str, df: &mut DataFrame) -> Result<PathBuf> {
        let path = self.table_path(table);
        ParquetWriter::new(fs::File::create(&path)?).finish(df)?;
        log::info!("Stored {} rows in {}", df.height(), path.display());
        Ok(path)
    }
}

fn merged_frame(records: &[MergedRecord]) -> Result<DataFrame> {
    let df = df!(
        "country" => records.iter().map(|r| r.country.as_str()).collect::<Vec<_>>(),
        "month" => records.iter().map(|r| r.month.as_str()).collect::<Vec<_>>(),
        "Balance" => records.iter().map(|r| r.balance.as_deref()).collect::<Vec<_>>(),
        "production_type" => records.iter().map(|r| r.production_type.as_str()).collect::<Vec<_>>(),
        "value_gwh" => records.iter().map(|r| r.value_gwh).collect::<Vec<_>>(),
        "avg_temp_c" => records.iter().map(|r| r.avg_temp_c).collect::<Vec<_>>(),
        "precip_mm" => records.iter().map(|r| r.precip_mm).collect::<Vec<_>>(),
        "wind_kmh" => records.iter().map(|r| r.wind_kmh).collect::<Vec<_>>()
    )?;
    Ok(df)
}

/// Copy report files into the dashboard export directory.
pub fn export_reports<P: AsRef<Path>>(files: &[PathBuf], export_dir: P) -> Result<Vec<PathBuf>> {
    let export_dir = export_dir.as_ref();
    fs::create_dir_all(export_dir)?;

    let mut exported = Vec::with_capacity(files.len());
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let dest = export_dir.join(name);
        fs::copy(file, &dest)?;
        log::info!("Exported {} to {}", file.display(), dest.display());
        exported.push(dest);
    }

    Ok(exported)
}
