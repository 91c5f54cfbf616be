//! Canonical line-item taxonomy.
//!
//! A [`Taxonomy`] is loaded once from a JSON document and is immutable afterwards. It
//! carries the matching rules for every canonical key (literal synonyms and regular
//! expressions), the rollup groups that shape the output hierarchy, the company-marker
//! keywords used during metadata detection, and the derived "change in X" rules used
//! for cash-flow working-capital lines.

use crate::error::{Result, StatementParserError};
use log::debug;
use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

const BUILTIN_TAXONOMY: &str = include_str!("../taxonomy/default.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CanonEntry {
    #[serde(default)]
    #[schemars(description = "Literal label spellings, used as fuzzy-match candidates")]
    pub synonyms: Vec<String>,

    #[serde(default)]
    #[schemars(
        description = "Regular expressions searched (not full-matched) against the lower-cased label. Checked before any fuzzy matching."
    )]
    pub regex: Vec<String>,
}

/// Canonical key → matching rules, kept in document order.
///
/// The order of entries is the order of the regex pass, so it has to survive
/// deserialization rather than being re-sorted by a map type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonMap(pub Vec<(String, CanonEntry)>);

impl CanonMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonEntry)> {
        self.0.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CanonMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, entry)| (key, entry)))
    }
}

impl<'de> Deserialize<'de> for CanonMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CanonVisitor;

        impl<'de> Visitor<'de> for CanonVisitor {
            type Value = CanonMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of canonical keys to matching rules")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, entry)) = access.next_entry::<String, CanonEntry>()? {
                    entries.push((key, entry));
                }
                Ok(CanonMap(entries))
            }
        }

        deserializer.deserialize_map(CanonVisitor)
    }
}

impl JsonSchema for CanonMap {
    fn schema_name() -> String {
        "CanonMap".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <BTreeMap<String, CanonEntry>>::json_schema(gen)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AssetRollups {
    pub current_assets: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Non-current asset keys reported individually and added to total assets")]
    pub singletons: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LiabilityEquityRollups {
    pub current_liabilities: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Canonical key holding the long-term loan balance, if any")]
    pub loan_payable: Option<String>,

    pub shareholders_equity: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BalanceSheetRollups {
    pub assets: AssetRollups,
    pub liabilities_and_equity: LiabilityEquityRollups,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct IncomeStatementRollups {
    pub expenses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CashFlowRollups {
    #[serde(default = "default_investing_activities")]
    pub investing_activities: Vec<String>,

    #[serde(default = "default_financing_activities")]
    pub financing_activities: Vec<String>,
}

impl Default for CashFlowRollups {
    fn default() -> Self {
        Self {
            investing_activities: default_investing_activities(),
            financing_activities: default_financing_activities(),
        }
    }
}

pub fn default_investing_activities() -> Vec<String> {
    vec!["purchase_of_property_and_equipment".to_string()]
}

pub fn default_financing_activities() -> Vec<String> {
    [
        "repayment_of_shareholder_loan",
        "dividends_paid",
        "repayment_of_loan_payable",
        "redemption_of_capital_stock",
    ]
    .iter()
    .map(|key| key.to_string())
    .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RollupConfig {
    pub balance_sheet: BalanceSheetRollups,
    pub income_statement: IncomeStatementRollups,

    #[serde(default)]
    pub cash_flows: CashFlowRollups,
}

impl RollupConfig {
    /// Every canonical key referenced by any group, in configuration order.
    pub fn member_keys(&self) -> impl Iterator<Item = &str> {
        let assets = &self.balance_sheet.assets;
        let liabilities = &self.balance_sheet.liabilities_and_equity;

        assets
            .current_assets
            .iter()
            .chain(assets.singletons.iter())
            .chain(liabilities.current_liabilities.iter())
            .chain(liabilities.loan_payable.iter())
            .chain(liabilities.shareholders_equity.iter())
            .chain(self.income_statement.expenses.iter())
            .chain(self.cash_flows.investing_activities.iter())
            .chain(self.cash_flows.financing_activities.iter())
            .map(String::as_str)
    }
}

/// Substring rule mapping a cash-flow working-capital description to a derived key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DerivedRule {
    #[schemars(description = "Lower-case phrase looked for anywhere in the label")]
    pub phrase: String,

    #[schemars(description = "Derived canonical key, e.g. change_accounts_receivable")]
    pub key: String,
}

impl DerivedRule {
    fn new(phrase: &str, key: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            key: key.to_string(),
        }
    }
}

pub fn default_derived_rules() -> Vec<DerivedRule> {
    vec![
        DerivedRule::new("accounts receivable", "change_accounts_receivable"),
        DerivedRule::new(
            "investment tax credits receivable",
            "change_investment_tax_credits_receivable",
        ),
        DerivedRule::new("inventories", "change_inventories"),
        DerivedRule::new("prepaid expenses", "change_prepaid_expenses"),
        DerivedRule::new(
            "accounts payable and accrued liabilities",
            "change_accounts_payable_and_accrued_liabilities",
        ),
        DerivedRule::new(
            "government remittances payable",
            "change_government_remittances_payable",
        ),
        DerivedRule::new("deferred revenue", "change_deferred_revenue"),
    ]
}

/// The serialized form of a taxonomy file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TaxonomyConfig {
    #[schemars(description = "Canonical key to matching rules. Entry order is the regex-pass order.")]
    pub canon: CanonMap,

    pub rollups: RollupConfig,

    #[serde(default)]
    #[schemars(description = "Substrings that mark a line as the company name, matched case-insensitively")]
    pub company_markers: Vec<String>,

    #[serde(default = "default_derived_rules")]
    #[schemars(description = "Fallback rules for cash-flow 'change in X' lines, checked in order")]
    pub derived: Vec<DerivedRule>,
}

/// Compiled, validated taxonomy shared read-only by every pipeline stage.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    config: TaxonomyConfig,
    patterns: Vec<(String, Vec<Regex>)>,
    fuzzy_pool: Vec<String>,
    synonym_owner: HashMap<String, String>,
}

impl Taxonomy {
    pub fn new(mut config: TaxonomyConfig) -> Result<Self> {
        for marker in config.company_markers.iter_mut() {
            *marker = marker.to_lowercase();
        }
        for rule in config.derived.iter_mut() {
            rule.phrase = rule.phrase.to_lowercase();
        }

        validate_config(&config)?;

        let mut patterns = Vec::with_capacity(config.canon.len());
        let mut fuzzy_pool = Vec::new();
        let mut synonym_owner = HashMap::new();

        for (key, entry) in config.canon.iter() {
            let mut compiled = Vec::with_capacity(entry.regex.len());
            for pattern in &entry.regex {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| StatementParserError::InvalidPattern {
                        key: key.to_string(),
                        pattern: pattern.clone(),
                        source,
                    })?;
                compiled.push(regex);
            }
            patterns.push((key.to_string(), compiled));

            for synonym in &entry.synonyms {
                let synonym = synonym.to_lowercase();
                synonym_owner.insert(synonym.clone(), key.to_string());
                fuzzy_pool.push(synonym);
            }
            for pattern in &entry.regex {
                fuzzy_pool.push(pattern.to_lowercase());
            }
        }

        debug!(
            "Loaded taxonomy with {} canonical keys, {} fuzzy candidates and {} derived rules",
            config.canon.len(),
            fuzzy_pool.len(),
            config.derived.len()
        );

        Ok(Self {
            config,
            patterns,
            fuzzy_pool,
            synonym_owner,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TaxonomyConfig = serde_json::from_str(json)?;
        Self::new(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The taxonomy bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_TAXONOMY)
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    pub fn rollups(&self) -> &RollupConfig {
        &self.config.rollups
    }

    pub fn company_markers(&self) -> &[String] {
        &self.config.company_markers
    }

    pub fn derived_rules(&self) -> &[DerivedRule] {
        &self.config.derived
    }

    /// Compiled regex rules per canonical key, in regex-pass order.
    pub fn patterns(&self) -> impl Iterator<Item = (&str, &[Regex])> {
        self.patterns
            .iter()
            .map(|(key, regexes)| (key.as_str(), regexes.as_slice()))
    }

    /// Lower-cased synonyms and regex sources of every entry.
    pub fn fuzzy_pool(&self) -> &[String] {
        &self.fuzzy_pool
    }

    /// Canonical key that owns a lower-cased synonym. Regex sources have no owner.
    pub fn synonym_owner(&self, candidate: &str) -> Option<&str> {
        self.synonym_owner.get(candidate).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.config.canon.contains_key(key)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TaxonomyConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

fn validate_config(config: &TaxonomyConfig) -> Result<()> {
    if config.canon.is_empty() {
        return Err(StatementParserError::InvalidTaxonomy(
            "canon must contain at least one entry".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (key, _) in config.canon.iter() {
        if !seen.insert(key) {
            return Err(StatementParserError::InvalidTaxonomy(format!(
                "canonical key '{}' is defined more than once",
                key
            )));
        }
    }

    let derived: HashSet<&str> = config.derived.iter().map(|r| r.key.as_str()).collect();
    // Built-in cash-flow members may be absent from canon; they then roll up as zero.
    let cash_flow_defaults: Vec<String> = default_investing_activities()
        .into_iter()
        .chain(default_financing_activities())
        .collect();

    for member in config.rollups.member_keys() {
        if !config.canon.contains_key(member)
            && !derived.contains(member)
            && !cash_flow_defaults.iter().any(|key| key == member)
        {
            return Err(StatementParserError::InvalidTaxonomy(format!(
                "rollup member '{}' has no canon entry or derived rule",
                member
            )));
        }
    }

    Ok(())
}
