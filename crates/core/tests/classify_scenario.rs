use std::cell::Cell;
use std::time::Duration;

use eiweet_core::catalog::{
    FIRST_PASS, FIRST_PASS_DATE, FIRST_PASS_RATIONALE, PRODUCTS_SHEET, PRODUCT_NAME,
};
use eiweet_core::{classify_unresolved, BatchSettings, ClassificationPlan, RunReport};
use eiweet_llm::{LlmError, LlmResponse};
use eiweet_sheets::{MemoryWorkbook, Table, TableStore};

fn products(rows: usize) -> Table {
    let mut table = Table::new([PRODUCT_NAME, FIRST_PASS]);
    for idx in 0..rows {
        table.push_row([(PRODUCT_NAME, format!("Product {idx}"))]);
    }
    table
}

fn plan() -> ClassificationPlan {
    ClassificationPlan::product_first_pass(&["rationale"]).unwrap()
}

fn settings() -> BatchSettings {
    BatchSettings {
        checkpoint_every: 3,
        delay: Duration::ZERO,
    }
}

/// Answers each `ID:<n> | Product:…` prompt line in the requested format.
fn answer(prompt: &str) -> Result<LlmResponse, LlmError> {
    let content = prompt
        .lines()
        .filter(|line| line.contains("| Product:"))
        .filter_map(|line| line.strip_prefix("ID:"))
        .filter_map(|rest| rest.split(' ').next())
        .map(|id| format!("ID:{id} | oordeel:Plantaardig | rationale:Bevat soja."))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(LlmResponse {
        content,
        prompt_tokens: 100,
        completion_tokens: 40,
    })
}

fn run(
    book: &MemoryWorkbook,
    rows: usize,
    batch_size: usize,
    fail_batch: Option<usize>,
) -> (Table, RunReport) {
    book.replace(PRODUCTS_SHEET, &products(rows)).unwrap();
    let before = book.writes(PRODUCTS_SHEET);
    let mut plan = plan();
    plan.batch_size = batch_size;
    let calls = Cell::new(0);
    let invoke = |prompt: &str| {
        calls.set(calls.get() + 1);
        if Some(calls.get()) == fail_batch {
            return Err(LlmError::Api {
                status: 503,
                body: "overloaded".into(),
            });
        }
        answer(prompt)
    };
    let table = book.load(PRODUCTS_SHEET).unwrap();
    let (table, report) = classify_unresolved(table, &plan, &settings(), invoke, |snapshot| {
        book.replace(PRODUCTS_SHEET, snapshot)
    })
    .unwrap();
    assert_eq!(book.writes(PRODUCTS_SHEET) - before, report.checkpoints);
    (table, report)
}

#[test]
fn failed_middle_batch_stays_unresolved_with_one_merged_checkpoint() {
    let book = MemoryWorkbook::new();
    let (table, report) = run(&book, 45, 20, Some(2));

    assert_eq!(report.batches, 3);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.considered, 45);
    assert_eq!(report.resolved, 25);
    assert_eq!(report.unresolved, 20);
    assert_eq!(report.checkpoints, 1);

    for idx in 20..40 {
        assert_eq!(table.get(idx, FIRST_PASS), "", "row {idx} should be untouched");
        assert_eq!(table.get(idx, FIRST_PASS_DATE), "");
    }
    for idx in (0..20).chain(40..45) {
        assert_eq!(table.get(idx, FIRST_PASS), "Plantaardig");
        assert_eq!(table.get(idx, FIRST_PASS_RATIONALE), "Bevat soja.");
    }
    assert_eq!(book.sheet(PRODUCTS_SHEET).unwrap(), table);
}

#[test]
fn checkpoint_count_follows_batch_count() {
    for (batches, expected) in [(1, 1), (2, 1), (3, 1), (4, 2), (6, 2), (7, 3), (9, 3)] {
        let book = MemoryWorkbook::new();
        let (_, report) = run(&book, batches * 2, 2, None);
        assert_eq!(report.batches, batches);
        assert_eq!(report.checkpoints, expected, "{batches} batches");
    }
}

#[test]
fn checkpoint_count_ignores_failures() {
    let book = MemoryWorkbook::new();
    let (_, report) = run(&book, 8, 2, Some(3));
    assert_eq!(report.batches, 4);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.checkpoints, 2);
}

#[test]
fn second_run_only_retries_what_is_left() {
    let book = MemoryWorkbook::new();
    let (first, _) = run(&book, 45, 20, Some(2));
    let resolved_before: Vec<String> = first
        .column_values(FIRST_PASS_DATE)
        .map(str::to_string)
        .collect();

    let mut plan = plan();
    plan.batch_size = 20;
    let (second, report) =
        classify_unresolved(first, &plan, &settings(), answer, |_| Ok(())).unwrap();
    assert_eq!(report.considered, 20);
    assert_eq!(report.unresolved, 0);
    for idx in (0..20).chain(40..45) {
        assert_eq!(second.get(idx, FIRST_PASS_DATE), resolved_before[idx]);
    }
}

#[test]
fn token_usage_is_summed_over_successful_batches() {
    let book = MemoryWorkbook::new();
    let (_, report) = run(&book, 45, 20, Some(2));
    assert_eq!(report.prompt_tokens, 200);
    assert_eq!(report.completion_tokens, 80);
}
