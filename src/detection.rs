use crate::schema::{DocumentMetadata, AUTO_CURRENCY};
use crate::taxonomy::Taxonomy;
use crate::utils::month_index;
use chrono::NaiveDate;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_LONG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(JANUARY|FEBRUARY|MARCH|APRIL|MAY|JUNE|JULY|AUGUST|SEPTEMBER|OCTOBER|NOVEMBER|DECEMBER)\s+(\d{1,2}),?\s*((?:19|20)\d{2})\b",
    )
    .expect("valid long date regex")
});

/// Checked in order against the upper-cased text; the first hit wins.
pub const CURRENCY_CODES: [&str; 14] = [
    "USD", "CAD", "EUR", "GBP", "AUD", "NZD", "JPY", "CHF", "SEK", "NOK", "DKK", "HKD", "SGD",
    "INR",
];

const MIN_COMPANY_LINE_CHARS: usize = 5;

/// Longest trimmed line containing one of the (lower-case) company markers.
pub fn detect_company(text: &str, markers: &[String]) -> Option<String> {
    let mut company: Option<&str> = None;

    for line in text.lines() {
        let line = line.trim();
        let length = line.chars().count();
        if length <= MIN_COMPANY_LINE_CHARS {
            continue;
        }

        let lower = line.to_lowercase();
        if !markers.iter().any(|marker| lower.contains(marker.as_str())) {
            continue;
        }

        if company.map_or(true, |current| length > current.chars().count()) {
            company = Some(line);
        }
    }

    company.map(str::to_string)
}

/// First `MONTH DAY, YEAR` mention that names a real calendar date.
pub fn detect_period(text: &str) -> Option<NaiveDate> {
    DATE_LONG_RE.captures_iter(text).find_map(|caps| {
        let month = month_index(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;

        let date = NaiveDate::from_ymd_opt(year, month, day);
        if date.is_none() {
            debug!("Skipping impossible period date '{}'", &caps[0]);
        }
        date
    })
}

pub fn detect_currency(text: &str) -> String {
    let upper = text.to_uppercase();

    if let Some(code) = CURRENCY_CODES.iter().find(|code| upper.contains(*code)) {
        return code.to_string();
    }
    if text.contains('£') {
        return "GBP".to_string();
    }
    if text.contains('€') {
        return "EUR".to_string();
    }

    AUTO_CURRENCY.to_string()
}

/// Runs company, period and currency detection over a document's pages.
///
/// Company and period are looked for page by page until both are known. A longer
/// company candidate on a later page replaces an earlier one; the period is taken from
/// the first page that has one. Currency is detected over the whole text.
pub fn detect_metadata<S: AsRef<str>>(pages: &[S], taxonomy: &Taxonomy) -> DocumentMetadata {
    let mut company: Option<String> = None;
    let mut period_end: Option<NaiveDate> = None;

    for page in pages {
        if company.is_some() && period_end.is_some() {
            break;
        }
        let page = page.as_ref();

        if let Some(candidate) = detect_company(page, taxonomy.company_markers()) {
            let longer = company
                .as_ref()
                .map_or(true, |current| candidate.chars().count() > current.chars().count());
            if longer {
                company = Some(candidate);
            }
        }

        if period_end.is_none() {
            period_end = detect_period(page);
        }
    }

    let full_text = join_pages(pages);
    let currency = detect_currency(&full_text);

    DocumentMetadata {
        company,
        period_end,
        currency,
    }
}

pub(crate) fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n")
}
