use chrono::{Datelike, Local, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNKNOWN_COMPANY: &str = "UNKNOWN";
pub const AUTO_CURRENCY: &str = "AUTO";

/// Fields inferred once per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentMetadata {
    #[schemars(description = "Longest line containing a company marker, if any")]
    pub company: Option<String>,

    #[schemars(description = "First long-form date (e.g. 'December 31, 2023') found in the document")]
    pub period_end: Option<NaiveDate>,

    #[schemars(description = "Detected ISO-like currency code, or AUTO when none was found")]
    pub currency: String,
}

impl DocumentMetadata {
    pub fn company_or_unknown(&self) -> &str {
        self.company.as_deref().unwrap_or(UNKNOWN_COMPANY)
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            company: None,
            period_end: None,
            currency: AUTO_CURRENCY.to_string(),
        }
    }
}

/// Tunables for a parsing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParserOptions {
    #[serde(default = "default_fuzzy_threshold")]
    #[schemars(description = "Minimum token-sort similarity (0-100) for a fuzzy label match")]
    pub fuzzy_threshold: f64,

    #[serde(default = "default_diagnostic_tolerance")]
    #[schemars(description = "Absolute residual above which a reconciliation check emits a warning")]
    pub diagnostic_tolerance: f64,

    #[serde(default)]
    #[schemars(
        description = "Fiscal year used when the document mentions no year and no period end. Defaults to the current calendar year."
    )]
    pub reference_year: Option<i32>,
}

fn default_fuzzy_threshold() -> f64 {
    84.0
}

fn default_diagnostic_tolerance() -> f64 {
    1.0
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            diagnostic_tolerance: default_diagnostic_tolerance(),
            reference_year: None,
        }
    }
}

impl ParserOptions {
    pub fn fallback_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Local::now().year())
    }
}

/// A named set of canonical keys and their rounded sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RollupGroup {
    pub components: BTreeMap<String, f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetsSection {
    pub current_assets: RollupGroup,

    /// Non-current singleton keys, serialized inline next to `current_assets`.
    #[serde(flatten)]
    pub non_current: BTreeMap<String, f64>,

    pub total_assets: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LiabilitiesAndEquitySection {
    pub current_liabilities: RollupGroup,
    pub loan_payable: f64,
    pub shareholders_equity: RollupGroup,
    pub total_liabilities_and_equity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheet {
    pub assets: AssetsSection,
    pub liabilities_and_equity: LiabilitiesAndEquitySection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetainedEarningsRollforward {
    pub beginning: f64,
    pub dividends: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatement {
    pub revenue: f64,
    pub expenses: RollupGroup,
    pub income_before_income_taxes: f64,
    pub income_taxes: f64,
    pub net_income: f64,
    pub retained_earnings_rollforward: RetainedEarningsRollforward,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlows {
    pub operating_activities: RollupGroup,
    pub investing_activities: RollupGroup,
    pub financing_activities: RollupGroup,
    pub increase_in_cash: f64,
    pub cash_beginning: f64,
    pub cash_end: f64,
}

/// Signed residuals of the reconciliation checks, each rounded to cents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationChecks {
    pub balance_sheet_identity: f64,
    pub retained_earnings_recon: f64,
    pub cash_bridge: f64,
    pub ibt_vs_rev_minus_exp: f64,
}

impl ReconciliationChecks {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("balance_sheet_identity", self.balance_sheet_identity),
            ("retained_earnings_recon", self.retained_earnings_recon),
            ("cash_bridge", self.cash_bridge),
            ("ibt_vs_rev_minus_exp", self.ibt_vs_rev_minus_exp),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostics {
    pub checks: ReconciliationChecks,

    #[schemars(description = "One '<check> mismatch: <residual>' entry per check outside tolerance")]
    pub warnings: Vec<String>,

    #[serde(default)]
    #[schemars(
        description = "Values for this fiscal year that were replaced by a later line resolving to the same canonical key"
    )]
    pub overwrites: Vec<String>,
}

/// One fiscal year of one company's statements. The unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RolledUpStatement {
    pub company: String,
    pub fiscal_year: i32,
    pub period_end: Option<NaiveDate>,
    pub currency: String,
    pub balance_sheet: BalanceSheet,
    pub income_statement: IncomeStatement,
    pub cash_flows: CashFlows,

    #[serde(rename = "_diagnostics")]
    pub diagnostics: Diagnostics,
}

impl RolledUpStatement {
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.warnings.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RolledUpStatement)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_statement() -> RolledUpStatement {
        let mut non_current = BTreeMap::new();
        non_current.insert("intangible_assets".to_string(), 2500.0);

        RolledUpStatement {
            company: "Test Corp Inc.".to_string(),
            fiscal_year: 2023,
            period_end: NaiveDate::from_ymd_opt(2023, 12, 31),
            currency: "CAD".to_string(),
            balance_sheet: BalanceSheet {
                assets: AssetsSection {
                    current_assets: RollupGroup::default(),
                    non_current,
                    total_assets: 2500.0,
                },
                liabilities_and_equity: LiabilitiesAndEquitySection::default(),
            },
            income_statement: IncomeStatement::default(),
            cash_flows: CashFlows::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = RolledUpStatement::schema_as_json().unwrap();
        assert!(schema_json.contains("balance_sheet"));
        assert!(schema_json.contains("_diagnostics"));
    }

    #[test]
    fn test_serialization_shape() {
        let statement = sample_statement();
        let value = serde_json::to_value(&statement).unwrap();

        assert_eq!(value["period_end"], "2023-12-31");
        assert_eq!(value["balance_sheet"]["assets"]["intangible_assets"], 2500.0);
        assert!(value["_diagnostics"]["warnings"].is_array());

        let json = statement.to_json().unwrap();
        let deserialized: RolledUpStatement = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, statement);
    }

    #[test]
    fn test_default_options() {
        let options = ParserOptions::default();
        assert_eq!(options.fuzzy_threshold, 84.0);
        assert_eq!(options.diagnostic_tolerance, 1.0);

        let pinned: ParserOptions = serde_json::from_str(r#"{"reference_year": 2020}"#).unwrap();
        assert_eq!(pinned.fallback_year(), 2020);
        assert_eq!(pinned.fuzzy_threshold, 84.0);
    }

    #[test]
    fn test_unknown_company_sentinel() {
        let metadata = DocumentMetadata::default();
        assert_eq!(metadata.company_or_unknown(), UNKNOWN_COMPANY);
        assert_eq!(metadata.currency, AUTO_CURRENCY);
    }
}
