use crate::error::{Result, StatementParserError};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static NOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(note\s*\d+\)").expect("valid note reference regex"));

// Grouped ("1,234.56") or plain ("1234") digits, optionally signed, dollar-prefixed or
// wrapped in parentheses.
static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(?\$?\s*-?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?\)?").expect("valid amount regex")
});

/// A data line split into its label and the amounts that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub label: String,
    pub amounts: Vec<f64>,
}

/// Parses one amount token. Parentheses mean negative; `$`, spaces and thousands
/// separators are ignored; an empty or lone `-` remainder is zero.
pub fn parse_money(token: &str) -> Result<f64> {
    let trimmed = token.trim();
    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');

    let digits = trimmed
        .trim_matches(|c: char| matches!(c, '(' | ')' | '$') || c.is_whitespace())
        .replace(',', "");

    if digits.is_empty() || digits == "-" {
        return Ok(0.0);
    }

    let value: f64 = digits
        .parse()
        .map_err(|_| StatementParserError::InvalidAmount(token.to_string()))?;

    Ok(if negative { -value } else { value })
}

/// Cleans a raw label: drops `(note N)` references, maps typographic quotes and
/// dashes to ASCII, collapses whitespace and trims surrounding `:`/`-`.
pub fn norm_label(raw: &str) -> String {
    let without_notes = NOTE_RE.replace_all(raw, "");
    let ascii: String = without_notes
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();

    ascii
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ' ' | ':' | '-'))
        .to_string()
}

/// Splits a text line into label and amounts.
///
/// Returns `None` for blank lines, lines without any numeric token, and lines whose
/// label is empty once normalized.
pub fn tokenize_line(line: &str) -> Option<TokenizedLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Note numbers must not be read as amounts nor cut the label short.
    let line = NOTE_RE.replace_all(line, "");

    let tokens: Vec<regex::Match> = AMOUNT_RE.find_iter(&line).collect();
    let first = tokens.first()?;

    let label = norm_label(&line[..first.start()]);
    if label.is_empty() {
        return None;
    }

    let amounts: Vec<f64> = tokens
        .iter()
        .map(|token| token.as_str())
        .filter(|token| token.chars().any(|c| c.is_ascii_digit()))
        .filter_map(|token| match parse_money(token) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Dropping token in line '{}': {}", line, e);
                None
            }
        })
        .collect();

    if amounts.is_empty() {
        return None;
    }

    Some(TokenizedLine { label, amounts })
}
