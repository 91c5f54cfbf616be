use crate::schema::{Diagnostics, ReconciliationChecks, RolledUpStatement};
use crate::utils::round_to_cents;
use log::warn;

/// Computes the four reconciliation residuals for a rolled-up statement.
///
/// - `balance_sheet_identity`: total assets − (current liabilities + loan payable + equity)
/// - `retained_earnings_recon`: (beginning RE + net income + dividends) − ending RE
/// - `cash_bridge`: (beginning cash + increase in cash) − ending cash
/// - `ibt_vs_rev_minus_exp`: (revenue − total expenses) − income before taxes
pub fn compute_checks(statement: &RolledUpStatement) -> ReconciliationChecks {
    let assets = &statement.balance_sheet.assets;
    let liabilities = &statement.balance_sheet.liabilities_and_equity;
    let income = &statement.income_statement;
    let rollforward = &income.retained_earnings_rollforward;
    let cash_flows = &statement.cash_flows;

    ReconciliationChecks {
        balance_sheet_identity: round_to_cents(
            assets.total_assets
                - (liabilities.current_liabilities.total
                    + liabilities.loan_payable
                    + liabilities.shareholders_equity.total),
        ),
        retained_earnings_recon: round_to_cents(
            (rollforward.beginning + income.net_income + rollforward.dividends) - rollforward.end,
        ),
        cash_bridge: round_to_cents(
            (cash_flows.cash_beginning + cash_flows.increase_in_cash) - cash_flows.cash_end,
        ),
        ibt_vs_rev_minus_exp: round_to_cents(
            (income.revenue - income.expenses.total) - income.income_before_income_taxes,
        ),
    }
}

/// Runs every check and emits a warning for each residual whose magnitude exceeds
/// `tolerance`. Mismatches are informational and never fail the pipeline.
///
/// Warnings read `"<check> mismatch: <residual>"` with the residual always printed to
/// two fixed decimals, e.g. `"cash_bridge mismatch: 250.50"`.
pub fn reconcile(statement: &RolledUpStatement, tolerance: f64) -> Diagnostics {
    let checks = compute_checks(statement);

    let warnings: Vec<String> = checks
        .iter()
        .filter(|(_, residual)| residual.abs() > tolerance)
        .map(|(name, residual)| format!("{} mismatch: {:.2}", name, residual))
        .collect();

    for warning in &warnings {
        warn!(
            "{} {}: {}",
            statement.company, statement.fiscal_year, warning
        );
    }

    Diagnostics {
        checks,
        warnings,
        overwrites: Vec::new(),
    }
}
