use crate::years::FiscalYears;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A (year, key) value that a later line replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overwrite {
    pub fiscal_year: i32,
    pub key: String,
    pub previous: f64,
    pub replacement: f64,
}

impl fmt::Display for Overwrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} overwritten: {} replaced by {}",
            self.key, self.previous, self.replacement
        )
    }
}

/// Per-year flat maps of canonical key → value. Last write wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearBuckets {
    buckets: BTreeMap<i32, BTreeMap<String, f64>>,
    overwrites: Vec<Overwrite>,
}

impl YearBuckets {
    /// One empty bucket per fiscal year, so every year yields a statement.
    pub fn new(years: &FiscalYears) -> Self {
        Self {
            buckets: years.years().iter().map(|&y| (y, BTreeMap::new())).collect(),
            overwrites: Vec::new(),
        }
    }

    /// Writes a resolved line.
    ///
    /// With two or more amounts in a document covering two or more years, the first two
    /// amounts are (current, prior) and land in the latest and earliest years. Otherwise
    /// the last amount goes to `context_year`.
    pub fn record(&mut self, years: &FiscalYears, context_year: i32, key: &str, amounts: &[f64]) {
        match amounts {
            [current, prior, ..] if years.spans_multiple_years() => {
                self.insert(years.latest(), key, *current);
                self.insert(years.earliest(), key, *prior);
            }
            [.., last] => self.insert(context_year, key, *last),
            [] => {}
        }
    }

    fn insert(&mut self, fiscal_year: i32, key: &str, value: f64) {
        let bucket = self.buckets.entry(fiscal_year).or_default();

        if let Some(previous) = bucket.insert(key.to_string(), value) {
            debug!(
                "Overwriting {} for {}: {} -> {}",
                key, fiscal_year, previous, value
            );
            self.overwrites.push(Overwrite {
                fiscal_year,
                key: key.to_string(),
                previous,
                replacement: value,
            });
        }
    }

    pub fn get(&self, fiscal_year: i32, key: &str) -> Option<f64> {
        self.buckets.get(&fiscal_year)?.get(key).copied()
    }

    pub fn year(&self, fiscal_year: i32) -> Option<&BTreeMap<String, f64>> {
        self.buckets.get(&fiscal_year)
    }

    /// Buckets in ascending year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &BTreeMap<String, f64>)> {
        self.buckets.iter().map(|(year, values)| (*year, values))
    }

    pub fn overwrites(&self) -> &[Overwrite] {
        &self.overwrites
    }

    pub fn overwrites_for(&self, fiscal_year: i32) -> impl Iterator<Item = &Overwrite> {
        self.overwrites
            .iter()
            .filter(move |o| o.fiscal_year == fiscal_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_years() -> FiscalYears {
        FiscalYears::resolve("2022 2023", None, 2030)
    }

    #[test]
    fn test_two_column_split() {
        let years = two_years();
        let mut buckets = YearBuckets::new(&years);

        buckets.record(&years, 2022, "cash", &[10000.0, 8000.0]);

        assert_eq!(buckets.get(2023, "cash"), Some(10000.0));
        assert_eq!(buckets.get(2022, "cash"), Some(8000.0));
    }

    #[test]
    fn test_single_value_uses_context_year() {
        let years = two_years();
        let mut buckets = YearBuckets::new(&years);

        buckets.record(&years, 2022, "revenue", &[5000.0]);

        assert_eq!(buckets.get(2022, "revenue"), Some(5000.0));
        assert_eq!(buckets.get(2023, "revenue"), None);
    }

    #[test]
    fn test_single_year_document_takes_last_value() {
        let years = FiscalYears::resolve("2023", None, 2030);
        let mut buckets = YearBuckets::new(&years);

        buckets.record(&years, 2023, "revenue", &[1.0, 2.0, 3.0]);

        assert_eq!(buckets.get(2023, "revenue"), Some(3.0));
    }

    #[test]
    fn test_last_write_wins_and_is_traced() {
        let years = two_years();
        let mut buckets = YearBuckets::new(&years);

        buckets.record(&years, 2023, "cash", &[100.0]);
        buckets.record(&years, 2023, "cash", &[250.0]);

        assert_eq!(buckets.get(2023, "cash"), Some(250.0));
        let traced: Vec<&Overwrite> = buckets.overwrites_for(2023).collect();
        assert_eq!(traced.len(), 1);
        assert_eq!(traced[0].previous, 100.0);
        assert_eq!(traced[0].to_string(), "cash overwritten: 100 replaced by 250");
        assert_eq!(buckets.overwrites_for(2022).count(), 0);
    }

    #[test]
    fn test_every_year_has_a_bucket() {
        let years = FiscalYears::resolve("2021 2022 2023", None, 2030);
        let buckets = YearBuckets::new(&years);
        let listed: Vec<i32> = buckets.iter().map(|(year, _)| year).collect();
        assert_eq!(listed, vec![2021, 2022, 2023]);
    }
}
