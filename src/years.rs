use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year regex"));

/// All 1900-2099 year tokens in `text`, in order of appearance.
pub fn find_years(text: &str) -> Vec<i32> {
    YEAR_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// The distinct fiscal years a document reports on, ascending and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalYears {
    years: Vec<i32>,
}

impl FiscalYears {
    /// Collects the years mentioned in `full_text`. When there are none, falls back to
    /// the period-end year, then to `fallback_year`.
    pub fn resolve(full_text: &str, period_end: Option<NaiveDate>, fallback_year: i32) -> Self {
        let found: BTreeSet<i32> = find_years(full_text).into_iter().collect();

        let years = if found.is_empty() {
            vec![period_end.map_or(fallback_year, |date| date.year())]
        } else {
            found.into_iter().collect()
        };

        Self { years }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn earliest(&self) -> i32 {
        self.years[0]
    }

    pub fn latest(&self) -> i32 {
        self.years[self.years.len() - 1]
    }

    pub fn spans_multiple_years(&self) -> bool {
        self.years.len() >= 2
    }

    /// Year context after entering `page`: the page's highest year if it mentions
    /// any, otherwise the context carried over from earlier pages.
    pub fn advance_context(&self, current: i32, page: &str) -> i32 {
        find_years(page).into_iter().max().unwrap_or(current)
    }
}
