use crate::diagnostics::reconcile;
use crate::schema::{
    AssetsSection, BalanceSheet, CashFlows, Diagnostics, DocumentMetadata, IncomeStatement,
    LiabilitiesAndEquitySection, RetainedEarningsRollforward, RolledUpStatement, RollupGroup,
};
use crate::taxonomy::Taxonomy;
use crate::utils::{round_to_cents, sum_keys};
use std::collections::BTreeMap;

/// Operating-activity components as (payload name, canonical key). Fixed rather than
/// taxonomy-driven: net income, two amortization add-backs, seven working-capital changes.
pub const OPERATING_ACTIVITIES: [(&str, &str); 10] = [
    ("net_income", "net_income"),
    (
        "adjustments_amortization_tangible",
        "amortization_of_tangible_assets",
    ),
    (
        "adjustments_amortization_intangible",
        "amortization_of_intangible_assets",
    ),
    ("change_accounts_receivable", "change_accounts_receivable"),
    (
        "change_investment_tax_credits_receivable",
        "change_investment_tax_credits_receivable",
    ),
    ("change_inventories", "change_inventories"),
    ("change_prepaid_expenses", "change_prepaid_expenses"),
    (
        "change_accounts_payable_and_accrued_liabilities",
        "change_accounts_payable_and_accrued_liabilities",
    ),
    (
        "change_government_remittances_payable",
        "change_government_remittances_payable",
    ),
    ("change_deferred_revenue", "change_deferred_revenue"),
];

/// Builds the nested per-year statement from a flat canonical-key map.
pub struct RollupBuilder<'a> {
    taxonomy: &'a Taxonomy,
    tolerance: f64,
}

impl<'a> RollupBuilder<'a> {
    pub fn new(taxonomy: &'a Taxonomy, tolerance: f64) -> Self {
        Self {
            taxonomy,
            tolerance,
        }
    }

    /// Pure: the same inputs always give the same statement. Missing keys count as zero.
    pub fn build(
        &self,
        metadata: &DocumentMetadata,
        fiscal_year: i32,
        values: &BTreeMap<String, f64>,
    ) -> RolledUpStatement {
        let get = |key: &str| values.get(key).copied().unwrap_or(0.0);
        let rollups = self.taxonomy.rollups();
        let asset_rollups = &rollups.balance_sheet.assets;
        let liability_rollups = &rollups.balance_sheet.liabilities_and_equity;

        let current_assets = group(values, &asset_rollups.current_assets);
        let non_current = components(values, &asset_rollups.singletons);
        let total_assets = sum_keys(values, &asset_rollups.current_assets)
            + sum_keys(values, &asset_rollups.singletons);

        let current_liabilities = group(values, &liability_rollups.current_liabilities);
        let loan_payable = liability_rollups
            .loan_payable
            .as_deref()
            .map_or(0.0, |key| get(key));
        let shareholders_equity = group(values, &liability_rollups.shareholders_equity);
        let total_liabilities_and_equity = sum_keys(values, &liability_rollups.current_liabilities)
            + loan_payable
            + sum_keys(values, &liability_rollups.shareholders_equity);

        let operating_components: BTreeMap<String, f64> = OPERATING_ACTIVITIES
            .iter()
            .map(|&(name, key)| (name.to_string(), get(key)))
            .collect();
        let operating_total = operating_components.values().sum::<f64>();

        let mut statement = RolledUpStatement {
            company: metadata.company_or_unknown().to_string(),
            fiscal_year,
            period_end: metadata.period_end,
            currency: metadata.currency.clone(),
            balance_sheet: BalanceSheet {
                assets: AssetsSection {
                    current_assets,
                    non_current,
                    total_assets: round_to_cents(total_assets),
                },
                liabilities_and_equity: LiabilitiesAndEquitySection {
                    current_liabilities,
                    loan_payable: round_to_cents(loan_payable),
                    shareholders_equity,
                    total_liabilities_and_equity: round_to_cents(total_liabilities_and_equity),
                },
            },
            income_statement: IncomeStatement {
                revenue: get("revenue"),
                expenses: group(values, &rollups.income_statement.expenses),
                income_before_income_taxes: get("income_before_income_taxes"),
                income_taxes: get("income_taxes"),
                net_income: get("net_income"),
                retained_earnings_rollforward: RetainedEarningsRollforward {
                    beginning: get("retained_earnings_beginning"),
                    dividends: get("dividends"),
                    end: get("retained_earnings_end_of_year"),
                },
            },
            cash_flows: CashFlows {
                operating_activities: RollupGroup {
                    components: operating_components,
                    total: round_to_cents(operating_total),
                },
                investing_activities: group(values, &rollups.cash_flows.investing_activities),
                financing_activities: group(values, &rollups.cash_flows.financing_activities),
                increase_in_cash: get("increase_in_cash"),
                cash_beginning: get("cash_beginning"),
                cash_end: get("cash_end"),
            },
            diagnostics: Diagnostics::default(),
        };

        statement.diagnostics = reconcile(&statement, self.tolerance);
        statement
    }
}

fn components(values: &BTreeMap<String, f64>, keys: &[String]) -> BTreeMap<String, f64> {
    keys.iter()
        .map(|key| (key.clone(), values.get(key).copied().unwrap_or(0.0)))
        .collect()
}

// The subtotal is summed from the raw values, so it can differ from re-adding the
// rounded components by a cent.
fn group(values: &BTreeMap<String, f64>, keys: &[String]) -> RollupGroup {
    RollupGroup {
        components: components(values, keys),
        total: round_to_cents(sum_keys(values, keys)),
    }
}
