use crate::error::{Result, StatementParserError};
use crate::schema::RolledUpStatement;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A statement ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStatement {
    pub company: String,
    pub fiscal_year: i32,
    pub period_end: Option<NaiveDate>,
    pub currency: String,
    pub source_filename: String,
    pub payload: RolledUpStatement,
}

impl NewStatement {
    pub fn from_statement(payload: RolledUpStatement, source_filename: impl Into<String>) -> Self {
        Self {
            company: payload.company.clone(),
            fiscal_year: payload.fiscal_year,
            period_end: payload.period_end,
            currency: payload.currency.clone(),
            source_filename: source_filename.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredStatement {
    pub id: u64,
    pub company: String,
    pub fiscal_year: i32,
    pub period_end: Option<NaiveDate>,
    pub currency: String,
    pub source_filename: String,
    pub payload: RolledUpStatement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementFilter {
    pub company: Option<String>,
    pub fiscal_year: Option<i32>,
}

impl StatementFilter {
    fn matches(&self, statement: &StoredStatement) -> bool {
        self.company
            .as_ref()
            .map_or(true, |company| *company == statement.company)
            && self
                .fiscal_year
                .map_or(true, |year| year == statement.fiscal_year)
    }
}

/// Persistence for rolled-up statements, unique on (company, fiscal_year).
pub trait StatementStore {
    /// Inserts, or replaces period, currency, source and payload of the existing row
    /// for the same (company, fiscal_year). The row id is kept on replace.
    fn upsert(&mut self, statement: NewStatement) -> Result<StoredStatement>;

    /// Matching rows ordered by company, then fiscal year descending.
    fn list(&self, filter: &StatementFilter) -> Result<Vec<StoredStatement>>;

    fn get(&self, id: u64) -> Result<StoredStatement>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStatementStore {
    rows: BTreeMap<u64, StoredStatement>,
    index: HashMap<(String, i32), u64>,
    last_id: u64,
}

impl InMemoryStatementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<&StoredStatement> = self.rows.values().collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

impl StatementStore for InMemoryStatementStore {
    fn upsert(&mut self, statement: NewStatement) -> Result<StoredStatement> {
        let unique_key = (statement.company.clone(), statement.fiscal_year);

        let id = match self.index.get(&unique_key) {
            Some(&id) => {
                debug!(
                    "Replacing statement {} for {} {}",
                    id, statement.company, statement.fiscal_year
                );
                id
            }
            None => {
                self.last_id += 1;
                self.index.insert(unique_key, self.last_id);
                self.last_id
            }
        };

        let stored = StoredStatement {
            id,
            company: statement.company,
            fiscal_year: statement.fiscal_year,
            period_end: statement.period_end,
            currency: statement.currency,
            source_filename: statement.source_filename,
            payload: statement.payload,
        };
        self.rows.insert(id, stored.clone());

        Ok(stored)
    }

    fn list(&self, filter: &StatementFilter) -> Result<Vec<StoredStatement>> {
        let mut rows: Vec<StoredStatement> = self
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            a.company
                .cmp(&b.company)
                .then_with(|| b.fiscal_year.cmp(&a.fiscal_year))
        });

        Ok(rows)
    }

    fn get(&self, id: u64) -> Result<StoredStatement> {
        self.rows
            .get(&id)
            .cloned()
            .ok_or(StatementParserError::NotFound(id))
    }
}
