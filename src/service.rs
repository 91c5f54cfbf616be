use crate::error::Result;
use crate::ingestion::PageTextSource;
use crate::store::{NewStatement, StatementFilter, StatementStore, StoredStatement};
use crate::StatementParser;
use log::info;

/// Upload, list and get over a page-text source, the parser and a statement store.
pub struct StatementService<'a, E, S> {
    parser: StatementParser<'a>,
    extractor: E,
    store: S,
}

impl<'a, E, S> StatementService<'a, E, S>
where
    E: PageTextSource,
    S: StatementStore,
{
    pub fn new(parser: StatementParser<'a>, extractor: E, store: S) -> Self {
        Self {
            parser,
            extractor,
            store,
        }
    }

    /// Parses a document and upserts one statement per fiscal year, oldest first.
    ///
    /// Fails only when the document cannot be turned into page text; nothing is stored
    /// in that case.
    pub fn upload(&mut self, filename: &str, document: &[u8]) -> Result<Vec<StoredStatement>> {
        let pages = self.extractor.extract_pages(document)?;
        let statements = self.parser.parse_pages(&pages);

        let mut stored = Vec::with_capacity(statements.len());
        for statement in statements {
            let row = self
                .store
                .upsert(NewStatement::from_statement(statement, filename))?;
            info!(
                "Stored statement {} for {} {} from {}",
                row.id, row.company, row.fiscal_year, filename
            );
            stored.push(row);
        }

        Ok(stored)
    }

    /// An empty company or a zero year means "no filter" for that field.
    pub fn list(
        &self,
        company: Option<&str>,
        fiscal_year: Option<i32>,
    ) -> Result<Vec<StoredStatement>> {
        let filter = StatementFilter {
            company: company
                .filter(|company| !company.is_empty())
                .map(str::to_string),
            fiscal_year: fiscal_year.filter(|&year| year != 0),
        };
        self.store.list(&filter)
    }

    pub fn get(&self, id: u64) -> Result<StoredStatement> {
        self.store.get(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
