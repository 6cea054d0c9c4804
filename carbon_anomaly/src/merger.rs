use crate::models::{MergedRecord, Observation, WeatherObservation};
use std::collections::HashMap;

/// Left join on `(country, month)`. Production order is kept; duplicate
/// weather keys multiply rows in weather order.
pub fn merge(production: &[Observation], weather: &[WeatherObservation]) -> Vec<MergedRecord> {
    let mut by_key: HashMap<(&str, &str), Vec<&WeatherObservation>> = HashMap::new();
    for w in weather {
        by_key
            .entry((w.country.as_str(), w.month.as_str()))
            .or_insert_with(Vec::new)
            .push(w);
    }

    let mut merged = Vec::with_capacity(production.len());
    let mut unmatched = 0;

    for observation in production {
        match by_key.get(&(observation.country.as_str(), observation.month.as_str())) {
            Some(matches) => {
                for &w in matches {
                    merged.push(MergedRecord::new(observation.clone(), Some(w)));
                }
            }
            None => {
                unmatched += 1;
                merged.push(MergedRecord::new(observation.clone(), None));
            }
        }
    }

    if unmatched > 0 {
        log::info!("{} production rows have no weather match", unmatched);
    }

    merged
}
