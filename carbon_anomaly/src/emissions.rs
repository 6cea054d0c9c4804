use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const FALLBACK_KEY: &str = "Electricity";

/// kg CO2e per MWh by production type.
const CANONICAL_FACTORS: [(&str, f64); 13] = [
    ("Coal, Peat and Manufactured Gases", 820.0),
    ("Oil and Petroleum Products", 650.0),
    ("Natural Gas", 490.0),
    ("Nuclear", 12.0),
    ("Hydro", 24.0),
    ("Wind", 11.0),
    ("Solar", 45.0),
    ("Geothermal", 38.0),
    ("Other Renewables", 30.0),
    ("Combustible Renewables", 230.0),
    ("Other Combustible Non-Renewables", 400.0),
    ("Electricity", 300.0),
    ("Not Specified", 300.0),
];

#[derive(Debug, Deserialize)]
struct FactorRow {
    production_type: String,
    factor: f64,
}

#[derive(Debug, Clone)]
pub struct EmissionsFactorTable {
    factors: HashMap<String, f64>,
    fallback_key: String,
}

impl EmissionsFactorTable {
    pub fn new(factors: HashMap<String, f64>, fallback_key: &str) -> Result<Self> {
        for (category, factor) in &factors {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(PipelineError::InvalidFactor {
                    category: category.clone(),
                    factor: *factor,
                });
            }
        }

        if !factors.contains_key(fallback_key) {
            return Err(PipelineError::MissingFallback(fallback_key.to_string()));
        }

        Ok(Self {
            factors,
            fallback_key: fallback_key.to_string(),
        })
    }

    pub fn canonical() -> Self {
        let factors = CANONICAL_FACTORS
            .iter()
            .map(|(category, factor)| (category.to_string(), *factor))
            .collect();

        Self {
            factors,
            fallback_key: FALLBACK_KEY.to_string(),
        }
    }

    /// Load an override table from a `production_type,factor` CSV. The file
    /// must carry the fallback entry itself.
    pub fn from_csv<P: AsRef<Path>>(path: P, fallback_key: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut factors = HashMap::new();

        for row in reader.deserialize::<FactorRow>() {
            let row = row?;
            factors.insert(row.production_type.trim().to_string(), row.factor);
        }

        Self::new(factors, fallback_key)
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, production_type: &str) -> Option<f64> {
        self.factors.get(production_type).copied()
    }

    pub fn fallback_factor(&self) -> f64 {
        self.factors[&self.fallback_key]
    }

    pub fn fallback_key(&self) -> &str {
        &self.fallback_key
    }

    /// Factor for a production type and whether the fallback was used.
    pub fn resolve(&self, production_type: &str) -> (f64, bool) {
        match self.get(production_type) {
            Some(factor) => (factor, false),
            None => (self.fallback_factor(), true),
        }
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl Default for EmissionsFactorTable {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_canonical_table() {
        let table = EmissionsFactorTable::canonical();
        assert_eq!(table.get("Solar"), Some(45.0));
        assert_eq!(table.get("Coal, Peat and Manufactured Gases"), Some(820.0));
        assert_eq!(table.get("Not Specified"), Some(300.0));
        assert_eq!(table.fallback_factor(), 300.0);
        assert_eq!(table.len(), 13);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let table = EmissionsFactorTable::canonical();
        assert_eq!(table.get("solar"), None);
        assert_eq!(table.resolve("solar"), (300.0, true));
        assert_eq!(table.resolve("Solar"), (45.0, false));
    }

    #[test]
    fn test_rejects_non_positive_factor() {
        let mut factors = HashMap::new();
        factors.insert("Electricity".to_string(), 300.0);
        factors.insert("Wind".to_string(), -1.0);

        let err = EmissionsFactorTable::new(factors, FALLBACK_KEY).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFactor { .. }));
    }

    #[test]
    fn test_requires_fallback_entry() {
        let mut factors = HashMap::new();
        factors.insert("Wind".to_string(), 11.0);

        let err = EmissionsFactorTable::new(factors, FALLBACK_KEY).unwrap_err();
        assert!(matches!(err, PipelineError::MissingFallback(_)));
    }

    #[test]
    fn test_override_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "production_type,factor").unwrap();
        writeln!(file, "Solar,40").unwrap();
        writeln!(file, "Electricity,250").unwrap();
        file.flush().unwrap();

        let table = EmissionsFactorTable::from_csv(file.path(), FALLBACK_KEY).unwrap();
        assert_eq!(table.get("Solar"), Some(40.0));
        assert_eq!(table.resolve("Hydro"), (250.0, true));
    }
}
