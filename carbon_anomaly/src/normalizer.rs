use crate::error::{PipelineError, Result};
use crate::models::{Observation, WeatherObservation};
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Tokens read as missing, the same set pandas treats as NA.
const NA_TOKENS: [&str; 17] = [
    "", "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null", "-1.#IND", "1.#IND",
];

struct ColumnRule {
    canonical: &'static str,
    aliases: &'static [&'static str],
}

const PRODUCTION_COLUMNS: [ColumnRule; 4] = [
    ColumnRule { canonical: "month", aliases: &["Time"] },
    ColumnRule { canonical: "country", aliases: &["Country"] },
    ColumnRule { canonical: "production_type", aliases: &["Product"] },
    ColumnRule { canonical: "value_gwh", aliases: &["Value"] },
];

const WEATHER_COLUMNS: [ColumnRule; 2] = [
    ColumnRule { canonical: "month", aliases: &["Month"] },
    ColumnRule { canonical: "country", aliases: &["Country"] },
];

/// Header positions after renaming. Missing canonical names are collected
/// so the error lists all of them at once.
struct ResolvedColumns {
    positions: Vec<usize>,
}

impl ResolvedColumns {
    fn resolve(headers: &StringRecord, rules: &[ColumnRule], table: &'static str) -> Result<Self> {
        let mut positions = Vec::with_capacity(rules.len());
        let mut missing = Vec::new();

        for rule in rules {
            match find_column(headers, rule.canonical, rule.aliases) {
                Some(idx) => positions.push(idx),
                None => missing.push(rule.canonical.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(PipelineError::Schema { table, missing });
        }

        Ok(Self { positions })
    }
}

fn find_column(headers: &StringRecord, canonical: &str, aliases: &[&str]) -> Option<usize> {
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    position(canonical).or_else(|| aliases.iter().find_map(|alias| position(*alias)))
}

pub fn is_missing(field: &str) -> bool {
    NA_TOKENS.contains(&field.trim())
}

fn text_field(record: &StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .filter(|f| !is_missing(f))
        .map(|f| f.trim().to_string())
}

fn numeric_field(
    record: &StringRecord,
    idx: Option<usize>,
    row: usize,
    column: &'static str,
) -> Result<Option<f64>> {
    let Some(raw) = idx.and_then(|i| record.get(i)) else {
        return Ok(None);
    };
    if is_missing(raw) {
        return Ok(None);
    }

    raw.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| PipelineError::InvalidNumber {
            row,
            column,
            value: raw.to_string(),
        })
}

/// Canonical `YYYY-MM` key. Accepts the IEA short form (`23-Jan`, century
/// 20 assumed), `YYYY-MM` and `YYYY-MM-DD`.
pub fn canonical_month(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let (year, rest) = raw.split_once('-')?;

    let date = if year.len() == 2 && year.bytes().all(|b| b.is_ascii_digit()) {
        NaiveDate::parse_from_str(&format!("20{}-01", raw), "%Y-%b-%d").ok()?
    } else if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
        // `%Y` accepts short years, so the digit widths are checked here.
        let mut parts = rest.split('-');
        let month = parts.next()?;
        let day = parts.next();
        if month.len() != 2 || day.is_some_and(|d| d.len() != 2) || parts.next().is_some() {
            return None;
        }
        let day = day.unwrap_or("01");
        NaiveDate::parse_from_str(&format!("{}-{}-{}", year, month, day), "%Y-%m-%d").ok()?
    } else {
        return None;
    };

    Some(date.format("%Y-%m").to_string())
}

fn month_field(record: &StringRecord, idx: usize, row: usize) -> Result<Option<String>> {
    match text_field(record, idx) {
        None => Ok(None),
        Some(raw) => canonical_month(&raw)
            .map(Some)
            .ok_or(PipelineError::InvalidMonth { row, value: raw }),
    }
}

pub struct SchemaNormalizer {
    countries: HashSet<String>,
}

impl SchemaNormalizer {
    pub fn new(countries: &[String]) -> Self {
        Self {
            countries: countries.iter().cloned().collect(),
        }
    }

    pub fn normalize_production_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Observation>> {
        let file = std::fs::File::open(path)?;
        self.normalize_production(file)
    }

    pub fn normalize_weather_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<WeatherObservation>> {
        let file = std::fs::File::open(path)?;
        self.normalize_weather(file)
    }

    /// Rename, validate and clean a raw production table.
    pub fn normalize_production<R: Read>(&self, input: R) -> Result<Vec<Observation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        let headers = reader.headers()?.clone();

        let columns = ResolvedColumns::resolve(&headers, &PRODUCTION_COLUMNS, "production")?;
        let (month_idx, country_idx, type_idx, value_idx) = (
            columns.positions[0],
            columns.positions[1],
            columns.positions[2],
            columns.positions[3],
        );
        let balance_idx = find_column(&headers, "Balance", &["balance"]);

        let mut observations = Vec::new();
        let mut dropped = 0;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let row = row + 1;

            let Some(country) = text_field(&record, country_idx) else {
                dropped += 1;
                continue;
            };
            let Some(month) = month_field(&record, month_idx, row)? else {
                dropped += 1;
                continue;
            };
            if !self.countries.contains(&country) {
                continue;
            }

            observations.push(Observation {
                country,
                month,
                balance: balance_idx.and_then(|idx| text_field(&record, idx)),
                production_type: text_field(&record, type_idx).unwrap_or_default(),
                value_gwh: numeric_field(&record, Some(value_idx), row, "value_gwh")?,
            });
        }

        log::info!(
            "Normalized {} production rows ({} dropped for missing month/country)",
            observations.len(),
            dropped
        );
        Ok(observations)
    }

    /// Rename, validate and clean a processed weather table.
    pub fn normalize_weather<R: Read>(&self, input: R) -> Result<Vec<WeatherObservation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        let headers = reader.headers()?.clone();

        let columns = ResolvedColumns::resolve(&headers, &WEATHER_COLUMNS, "weather")?;
        let (month_idx, country_idx) = (columns.positions[0], columns.positions[1]);
        let temp_idx = find_column(&headers, "avg_temp_c", &[]);
        let precip_idx = find_column(&headers, "precip_mm", &[]);
        let wind_idx = find_column(&headers, "wind_kmh", &[]);

        let mut observations = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let row = row + 1;

            let Some(country) = text_field(&record, country_idx) else {
                continue;
            };
            let Some(month) = month_field(&record, month_idx, row)? else {
                continue;
            };
            if !self.countries.contains(&country) {
                continue;
            }

            observations.push(WeatherObservation {
                country,
                month,
                avg_temp_c: numeric_field(&record, temp_idx, row, "avg_temp_c")?,
                precip_mm: numeric_field(&record, precip_idx, row, "precip_mm")?,
                wind_kmh: numeric_field(&record, wind_idx, row, "wind_kmh")?,
            });
        }

        log::info!("Normalized {} weather rows", observations.len());
        Ok(observations)
    }
}
