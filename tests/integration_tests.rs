use chrono::NaiveDate;
use financial_statement_parser::*;
use std::io::Write;
use std::sync::Arc;

const BALANCE_SHEET: &str = "Northwind Trading Ltd
Balance Sheet
December 31, 2023
Expressed in CAD
2023 2022
Assets
Current assets
Cash $ 12,000 $ 9,000
Accounts receivable (note 3) 8,000 7,000
Inventories 5,000 4,000
Prepaid expenses 1,000 1,000
Equipment and software 10,000 11,000
Total assets 36,000 32,000
Liabilities
Accounts payable and accrued liabilities 6,000 5,000
Deferred revenue 2,000 1,000
Loan payable 8,000 10,000
Shareholders\u{2019} equity
Capital stock 100 100
Retained earnings 19,900 15,900";

const INCOME_STATEMENT: &str = "Statement of Operations
Year ended December 31, 2023
2023 2022
Revenue 50,000 45,000
Cost of sales 20,000 18,000
Salaries and wages 15,000 14,000
Rent 4,000 4,000
Amortization of equipment 1,000 1,000
Income before income taxes 10,000 8,000
Income taxes 2,000 1,600
Net income 8,000 6,400
Retained earnings, beginning of year 15,900 12,500
Dividends (4,000) (3,000)
Retained earnings, end of year 19,900 15,900";

const CASH_FLOWS: &str = "Statement of Cash Flows
2023 2022
Operating activities
Net income 8,000 6,400
Amortization of equipment 1,000 1,000
(Increase) decrease in accounts receivable (1,000) 500
Increase in inventories (1,000) (500)
Increase in deferred revenue 1,000 200
Increase (decrease) in accounts payable and accrued liabilities 1,000 (600)
Financing activities
Dividends paid (4,000) (3,000)
Repayment of loan payable (2,000) (2,000)
Increase in cash 3,000 2,000
Cash, beginning of year 9,000 7,000
Cash, end of year 12,000 9,000";

fn document() -> Vec<String> {
    vec![
        BALANCE_SHEET.to_string(),
        INCOME_STATEMENT.to_string(),
        CASH_FLOWS.to_string(),
    ]
}

fn pinned_options() -> ParserOptions {
    ParserOptions {
        reference_year: Some(2023),
        ..Default::default()
    }
}

#[test]
fn test_full_document_reconciles() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let parser = StatementParser::with_options(&taxonomy, pinned_options());

    let statements = parser.parse_pages(&document());
    assert_eq!(statements.len(), 2);

    for statement in &statements {
        assert_eq!(statement.company, "Northwind Trading Ltd");
        assert_eq!(statement.currency, "CAD");
        assert_eq!(statement.period_end, NaiveDate::from_ymd_opt(2023, 12, 31));
        assert!(
            !statement.has_warnings(),
            "{} warnings: {:?}",
            statement.fiscal_year,
            statement.diagnostics.warnings
        );
    }

    let current = &statements[1];
    assert_eq!(current.fiscal_year, 2023);
    assert_eq!(current.balance_sheet.assets.current_assets.total, 26_000.0);
    assert_eq!(current.balance_sheet.assets.total_assets, 36_000.0);
    assert_eq!(
        current.balance_sheet.liabilities_and_equity.total_liabilities_and_equity,
        36_000.0
    );
    assert_eq!(current.income_statement.expenses.total, 40_000.0);
    assert_eq!(
        current.income_statement.retained_earnings_rollforward.dividends,
        -4_000.0
    );
    assert_eq!(current.cash_flows.operating_activities.total, 9_000.0);
    assert_eq!(current.cash_flows.financing_activities.total, -6_000.0);
    assert_eq!(
        current.cash_flows.operating_activities.components["change_accounts_receivable"],
        -1_000.0
    );

    let prior = &statements[0];
    assert_eq!(prior.fiscal_year, 2022);
    assert_eq!(prior.balance_sheet.assets.total_assets, 32_000.0);
    assert_eq!(prior.cash_flows.operating_activities.total, 7_000.0);
    assert_eq!(prior.diagnostics.checks.cash_bridge, 0.0);
}

#[test]
fn test_repeated_lines_are_traced_not_warned() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let parser = StatementParser::with_options(&taxonomy, pinned_options());

    let statements = parser.parse_pages(&document());
    let current = &statements[1];

    assert!(current
        .diagnostics
        .overwrites
        .iter()
        .any(|entry| entry.starts_with("net_income overwritten")));
    assert!(current
        .diagnostics
        .overwrites
        .iter()
        .any(|entry| entry.starts_with("retained_earnings_end_of_year overwritten")));
    assert!(current.diagnostics.warnings.is_empty());
}

#[test]
fn test_two_column_scenario() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let parser = StatementParser::with_options(&taxonomy, pinned_options());
    let pages = [
        "As at 2023 and 2022\nCash $ 10,000 8,000\nAccounts payable and accrued liabilities (500) 400",
    ];

    let document = parser.extract(&pages);

    let current_assets = &taxonomy.rollups().balance_sheet.assets.current_assets;
    assert!(current_assets.iter().any(|key| key == "cash"));
    assert_eq!(document.buckets.get(2023, "cash"), Some(10_000.0));
    assert_eq!(document.buckets.get(2022, "cash"), Some(8_000.0));
    assert_eq!(
        document
            .buckets
            .get(2023, "accounts_payable_and_accrued_liabilities"),
        Some(-500.0)
    );
    assert_eq!(
        document
            .buckets
            .get(2022, "accounts_payable_and_accrued_liabilities"),
        Some(400.0)
    );
}

#[test]
fn test_unmatched_line_contributes_nothing() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let parser = StatementParser::with_options(&taxonomy, pinned_options());

    let document = parser.extract(&["Fiscal 2023\nQuarterly gizmo throughput 4,200"]);

    assert!(document.buckets.iter().all(|(_, values)| values.is_empty()));
}

#[test]
fn test_fixture_taxonomy_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "canon": {{
                "subscription_total": {{ "synonyms": [], "regex": ["subscription"] }},
                "cash": {{ "synonyms": ["subscription revenue", "cash on hand"], "regex": [] }}
            }},
            "rollups": {{
                "balance_sheet": {{
                    "assets": {{ "current_assets": ["cash"] }},
                    "liabilities_and_equity": {{
                        "current_liabilities": [],
                        "shareholders_equity": []
                    }}
                }},
                "income_statement": {{ "expenses": [] }}
            }},
            "company_markers": ["GmbH"]
        }}"#
    )?;

    let taxonomy = Taxonomy::from_path(file.path())?;
    let parser = StatementParser::with_options(&taxonomy, pinned_options());
    let pages = ["Beispiel Handels GmbH\nFY 2023\nSubscription revenue 700\nOn hand cash 300"];

    let document = parser.extract(&pages);

    assert_eq!(document.metadata.company.as_deref(), Some("Beispiel Handels GmbH"));
    // The regex rule wins even though the label is also a literal synonym of `cash`.
    assert_eq!(document.buckets.get(2023, "subscription_total"), Some(700.0));
    assert_eq!(document.buckets.get(2023, "cash"), Some(300.0));
    Ok(())
}

#[test]
fn test_concurrent_documents_share_taxonomy() {
    let taxonomy = Arc::new(Taxonomy::builtin().unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let taxonomy = Arc::clone(&taxonomy);
            std::thread::spawn(move || {
                let parser = StatementParser::with_options(&taxonomy, pinned_options());
                let pages = vec![format!("Fiscal 2023\nCash {}", 1_250 * (i + 1))];
                parser.parse_pages(&pages)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let statements = handle.join().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].balance_sheet.assets.current_assets.components["cash"],
            1_250.0 * (i as f64 + 1.0)
        );
    }
}

#[test]
fn test_service_round_trip() -> anyhow::Result<()> {
    let taxonomy = Taxonomy::builtin()?;
    let parser = StatementParser::with_options(&taxonomy, pinned_options());
    let mut service = StatementService::new(parser, PlainTextPages, InMemoryStatementStore::new());

    let bytes = document().join("\x0c").into_bytes();
    let stored = service.upload("northwind-2023.pdf", &bytes)?;
    assert_eq!(stored.len(), 2);

    let listed = service.list(Some("Northwind Trading Ltd"), None)?;
    let years: Vec<i32> = listed.iter().map(|row| row.fiscal_year).collect();
    assert_eq!(years, vec![2023, 2022]);

    let fetched = service.get(listed[0].id)?;
    assert_eq!(fetched.payload, stored[1].payload);
    assert!(matches!(
        service.get(999),
        Err(StatementParserError::NotFound(999))
    ));
    Ok(())
}

#[test]
fn test_service_rejects_unparseable_document() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let parser = StatementParser::new(&taxonomy);
    let extractor = |_: &[u8]| -> Result<Vec<String>> {
        Err(StatementParserError::InputFormat("not a PDF".to_string()))
    };
    let mut service = StatementService::new(parser, extractor, InMemoryStatementStore::new());

    let err = service.upload("notes.txt", b"plain notes").unwrap_err();
    assert!(matches!(err, StatementParserError::InputFormat(_)));
    assert!(service.list(None, None).unwrap().is_empty());
}

#[test]
fn test_payload_json_shape() {
    let taxonomy = Taxonomy::builtin().unwrap();
    let parser = StatementParser::with_options(&taxonomy, pinned_options());

    let statements = parser.parse_pages(&document());
    let value = serde_json::to_value(&statements[1]).unwrap();

    assert_eq!(value["fiscal_year"], 2023);
    assert_eq!(value["period_end"], "2023-12-31");
    assert_eq!(value["balance_sheet"]["assets"]["equipment_and_software"], 10_000.0);
    assert_eq!(
        value["balance_sheet"]["liabilities_and_equity"]["loan_payable"],
        8_000.0
    );
    assert_eq!(value["_diagnostics"]["checks"]["balance_sheet_identity"], 0.0);
}
