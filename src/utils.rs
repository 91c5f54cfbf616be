use std::collections::BTreeMap;

const MONTHS: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

/// Rounds to two decimal places, halves away from zero.
pub fn round_to_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Normalize -0.0 so serialized payloads never carry a signed zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Maps an English month name (any case) to 1..=12.
pub fn month_index(name: &str) -> Option<u32> {
    let upper = name.trim().to_uppercase();
    MONTHS
        .iter()
        .position(|month| *month == upper)
        .map(|idx| idx as u32 + 1)
}

/// Sums the listed keys, treating absent keys as zero.
pub fn sum_keys<'a>(
    values: &BTreeMap<String, f64>,
    keys: impl IntoIterator<Item = &'a String>,
) -> f64 {
    keys.into_iter()
        .map(|key| values.get(key).copied().unwrap_or(0.0))
        .sum()
}
