use crate::error::{Result, StatementParserError};

/// Form feed, the page separator written by command-line PDF text extractors.
pub const PAGE_BREAK: char = '\u{000C}';

/// Turns a raw document into its pages' text, in reading order.
pub trait PageTextSource {
    fn extract_pages(&self, document: &[u8]) -> Result<Vec<String>>;
}

/// Reads already-extracted UTF-8 text, one page per form-feed separated chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextPages;

impl PageTextSource for PlainTextPages {
    fn extract_pages(&self, document: &[u8]) -> Result<Vec<String>> {
        let text = std::str::from_utf8(document).map_err(|e| {
            StatementParserError::InputFormat(format!("document is not valid UTF-8: {}", e))
        })?;

        if text.trim().is_empty() {
            return Err(StatementParserError::InputFormat(
                "document contains no text".to_string(),
            ));
        }

        let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
        // A trailing form feed closes the last page rather than opening a new one.
        if pages.len() > 1 && pages.last().map_or(false, |p| p.trim().is_empty()) {
            pages.pop();
        }

        Ok(pages)
    }
}

impl<F> PageTextSource for F
where
    F: Fn(&[u8]) -> Result<Vec<String>>,
{
    fn extract_pages(&self, document: &[u8]) -> Result<Vec<String>> {
        self(document)
    }
}
