//! # Financial Statement Parser
//!
//! A library for turning page-by-page financial statement text (as produced by a PDF
//! text extractor) into normalized, per-fiscal-year payloads with built-in arithmetic
//! reconciliation checks.
//!
//! ## Core Concepts
//!
//! - **Taxonomy**: Canonical line-item keys, their matching rules and rollup groups. Loaded once, shared read-only
//! - **Document Metadata**: Company, period end and currency inferred from the text, with `UNKNOWN`/`AUTO` fallbacks
//! - **Year Buckets**: Matched values partitioned by fiscal year. Two-column lines split into current and prior year
//! - **Rolled-Up Statement**: Balance sheet, income statement and cash flows for one company and fiscal year
//! - **Diagnostics**: Reconciliation residuals and warnings embedded in every statement
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_statement_parser::*;
//!
//! let taxonomy = Taxonomy::builtin()?;
//! let pages = vec![
//!     "Acme Widgets Ltd\nDecember 31, 2023\n2023 2022\nCash $ 10,000 8,000".to_string(),
//! ];
//!
//! let statements = parse_statement_pages(&pages, &taxonomy);
//! for statement in &statements {
//!     println!("{} {}: {}", statement.company, statement.fiscal_year, statement.to_json()?);
//! }
//! ```

pub mod accumulator;
pub mod detection;
pub mod diagnostics;
pub mod error;
pub mod ingestion;
pub mod matcher;
pub mod rollup;
pub mod schema;
pub mod service;
pub mod store;
pub mod taxonomy;
pub mod tokenizer;
pub mod utils;
pub mod years;

pub use accumulator::{Overwrite, YearBuckets};
pub use detection::{detect_company, detect_currency, detect_metadata, detect_period};
pub use diagnostics::{compute_checks, reconcile};
pub use error::{Result, StatementParserError};
pub use ingestion::{PageTextSource, PlainTextPages};
pub use matcher::{token_sort_ratio, CanonicalMatch, CanonicalMatcher, MatchPass};
pub use rollup::RollupBuilder;
pub use schema::*;
pub use service::StatementService;
pub use store::{
    InMemoryStatementStore, NewStatement, StatementFilter, StatementStore, StoredStatement,
};
pub use taxonomy::{Taxonomy, TaxonomyConfig};
pub use tokenizer::{norm_label, parse_money, tokenize_line, TokenizedLine};
pub use years::FiscalYears;

use detection::join_pages;
use log::{debug, info};

/// Everything extracted from one document before rollup.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub metadata: DocumentMetadata,
    pub years: FiscalYears,
    pub buckets: YearBuckets,
}

/// Runs the extraction pipeline for one document at a time against a shared taxonomy.
pub struct StatementParser<'a> {
    taxonomy: &'a Taxonomy,
    options: ParserOptions,
}

impl<'a> StatementParser<'a> {
    pub fn new(taxonomy: &'a Taxonomy) -> Self {
        Self::with_options(taxonomy, ParserOptions::default())
    }

    pub fn with_options(taxonomy: &'a Taxonomy, options: ParserOptions) -> Self {
        Self { taxonomy, options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Detects metadata and fiscal years, then tokenizes, matches and buckets every line.
    pub fn extract<S: AsRef<str>>(&self, pages: &[S]) -> ExtractedDocument {
        let metadata = detect_metadata(pages, self.taxonomy);
        let full_text = join_pages(pages);
        let years = FiscalYears::resolve(
            &full_text,
            metadata.period_end,
            self.options.fallback_year(),
        );

        info!(
            "Extracting statements for {} ({}), fiscal years {:?}",
            metadata.company_or_unknown(),
            metadata.currency,
            years.years()
        );

        let matcher = CanonicalMatcher::new(self.taxonomy, self.options.fuzzy_threshold);
        let mut buckets = YearBuckets::new(&years);
        let mut context_year = years.latest();
        let mut matched = 0usize;

        for page in pages {
            let page = page.as_ref();
            context_year = years.advance_context(context_year, page);

            for line in page.lines() {
                let tokenized = match tokenize_line(line) {
                    Some(tokenized) => tokenized,
                    None => continue,
                };

                match matcher.match_label(&tokenized.label) {
                    Some(found) => {
                        debug!(
                            "'{}' -> {} ({:?}) {:?}",
                            tokenized.label, found.key, found.pass, tokenized.amounts
                        );
                        buckets.record(&years, context_year, found.key, &tokenized.amounts);
                        matched += 1;
                    }
                    None => debug!("Unmatched label '{}'", tokenized.label),
                }
            }
        }

        debug!(
            "Matched {} lines, {} values overwritten",
            matched,
            buckets.overwrites().len()
        );

        ExtractedDocument {
            metadata,
            years,
            buckets,
        }
    }

    /// One statement per fiscal year, in ascending year order.
    pub fn build_statements(&self, document: &ExtractedDocument) -> Vec<RolledUpStatement> {
        let builder = RollupBuilder::new(self.taxonomy, self.options.diagnostic_tolerance);

        document
            .buckets
            .iter()
            .map(|(fiscal_year, values)| {
                let mut statement = builder.build(&document.metadata, fiscal_year, values);
                statement.diagnostics.overwrites = document
                    .buckets
                    .overwrites_for(fiscal_year)
                    .map(ToString::to_string)
                    .collect();
                statement
            })
            .collect()
    }

    pub fn parse_pages<S: AsRef<str>>(&self, pages: &[S]) -> Vec<RolledUpStatement> {
        let document = self.extract(pages);
        self.build_statements(&document)
    }
}

pub fn parse_statement_pages<S: AsRef<str>>(
    pages: &[S],
    taxonomy: &Taxonomy,
) -> Vec<RolledUpStatement> {
    StatementParser::new(taxonomy).parse_pages(pages)
}
