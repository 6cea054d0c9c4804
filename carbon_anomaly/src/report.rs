use crate::error::Result;
use crate::models::{AnomalyRecord, CarbonReportRow, MergedRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const MERGED_COLUMNS: [&str; 8] = [
    "country",
    "month",
    "Balance",
    "production_type",
    "value_gwh",
    "avg_temp_c",
    "precip_mm",
    "wind_kmh",
];

pub const ANOMALY_COLUMNS: [&str; 10] = [
    "country",
    "month",
    "Balance",
    "production_type",
    "value_gwh",
    "avg_temp_c",
    "precip_mm",
    "wind_kmh",
    "zscore",
    "anomaly",
];

pub const CARBON_REPORT_COLUMNS: [&str; 2] = ["month", "carbon_kg"];

/// Booleans as `True`/`False`, the form dashboards already read.
mod title_case_bool {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "True" | "true" | "1" => Ok(true),
            "False" | "false" | "0" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean '{}'", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AnomalyCsvRow {
    country: String,
    month: String,
    #[serde(rename = "Balance", default)]
    balance: Option<String>,
    production_type: String,
    #[serde(default)]
    value_gwh: Option<f64>,
    #[serde(default)]
    avg_temp_c: Option<f64>,
    #[serde(default)]
    precip_mm: Option<f64>,
    #[serde(default)]
    wind_kmh: Option<f64>,
    #[serde(default)]
    zscore: Option<f64>,
    #[serde(with = "title_case_bool")]
    anomaly: bool,
}

impl From<&AnomalyRecord> for AnomalyCsvRow {
    fn from(a: &AnomalyRecord) -> Self {
        let r = &a.record;
        Self {
            country: r.country.clone(),
            month: r.month.clone(),
            balance: r.balance.clone(),
            production_type: r.production_type.clone(),
            value_gwh: r.value_gwh,
            avg_temp_c: r.avg_temp_c,
            precip_mm: r.precip_mm,
            wind_kmh: r.wind_kmh,
            zscore: a.zscore,
            anomaly: a.anomaly,
        }
    }
}

impl From<AnomalyCsvRow> for AnomalyRecord {
    fn from(row: AnomalyCsvRow) -> Self {
        Self {
            record: MergedRecord {
                country: row.country,
                month: row.month,
                balance: row.balance,
                production_type: row.production_type,
                value_gwh: row.value_gwh,
                avg_temp_c: row.avg_temp_c,
                precip_mm: row.precip_mm,
                wind_kmh: row.wind_kmh,
            },
            zscore: row.zscore,
            anomaly: row.anomaly,
        }
    }
}

/// Header first, so an empty table still produces a readable file.
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: impl Iterator<Item = T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    write_rows_to(File::create(path)?, header, rows)
}

fn write_rows_to<W: Write, T: Serialize>(
    output: W,
    header: &[&str],
    rows: impl Iterator<Item = T>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn write_merged_csv<P: AsRef<Path>>(path: P, records: &[MergedRecord]) -> Result<()> {
    write_rows(path.as_ref(), &MERGED_COLUMNS, records.iter())
}

/// A literal `NaN` or `inf` in a numeric column reads as missing.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn clear_non_finite(record: &mut MergedRecord) {
    record.value_gwh = finite(record.value_gwh);
    record.avg_temp_c = finite(record.avg_temp_c);
    record.precip_mm = finite(record.precip_mm);
    record.wind_kmh = finite(record.wind_kmh);
}

pub fn read_merged_csv<P: AsRef<Path>>(path: P) -> Result<Vec<MergedRecord>> {
    let mut records: Vec<MergedRecord> = read_rows(path.as_ref())?;
    records.iter_mut().for_each(clear_non_finite);
    Ok(records)
}

pub fn write_anomalies_csv<P: AsRef<Path>>(path: P, anomalies: &[AnomalyRecord]) -> Result<()> {
    write_rows(
        path.as_ref(),
        &ANOMALY_COLUMNS,
        anomalies.iter().map(AnomalyCsvRow::from),
    )
}

pub fn read_anomalies_csv<P: AsRef<Path>>(path: P) -> Result<Vec<AnomalyRecord>> {
    let rows: Vec<AnomalyCsvRow> = read_rows(path.as_ref())?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let mut anomaly = AnomalyRecord::from(row);
            clear_non_finite(&mut anomaly.record);
            anomaly.zscore = finite(anomaly.zscore);
            anomaly
        })
        .collect())
}

pub fn write_carbon_report_csv<P: AsRef<Path>>(path: P, report: &[CarbonReportRow]) -> Result<()> {
    write_rows(path.as_ref(), &CARBON_REPORT_COLUMNS, report.iter())
}

/// Carbon report rows to any writer, e.g. stdout.
pub fn write_carbon_report<W: Write>(output: W, report: &[CarbonReportRow]) -> Result<()> {
    write_rows_to(output, &CARBON_REPORT_COLUMNS, report.iter())
}

pub fn read_carbon_report_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CarbonReportRow>> {
    read_rows(path.as_ref())
}
