use std::thread;
use std::time::Duration;

use eiweet_llm::{LlmError, LlmResponse};
use eiweet_sheets::{StoreError, Table};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::parse::{ClassificationResult, ResponseSchema};
use crate::prompt::{BatchItem, PromptTemplate};
use crate::select::unresolved_rows;
use crate::stamp::now_stamp;

pub const DEFAULT_CHECKPOINT_EVERY: usize = 3;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Everything one classification stage needs besides the table itself.
#[derive(Debug, Clone)]
pub struct ClassificationPlan {
    pub name: String,
    pub input_column: String,
    pub target_column: String,
    pub valid_labels: Vec<String>,
    pub template: PromptTemplate,
    pub schema: ResponseSchema,
    pub timestamp_column: String,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub checkpoint_every: usize,
    pub delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            delay: DEFAULT_BATCH_DELAY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub considered: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub checkpoints: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Classifies every unresolved row of `table` in batches of `plan.batch_size`.
///
/// Each batch is one `invoke` call. A failing call is logged and skipped,
/// leaving its rows unresolved. Every batch, failed or not, is followed by
/// `settings.delay`.
///
/// `checkpoint` receives the whole table after every `checkpoint_every`-th
/// batch and once more after the last batch. That final write is skipped
/// when the last batch number is itself a multiple of `checkpoint_every`,
/// so 3 batches write once and 4 batches write twice. A run with no
/// unresolved rows writes nothing. A checkpoint error ends the run.
pub fn classify_unresolved<F, C>(
    mut table: Table,
    plan: &ClassificationPlan,
    settings: &BatchSettings,
    invoke: F,
    mut checkpoint: C,
) -> Result<(Table, RunReport)>
where
    F: Fn(&str) -> std::result::Result<LlmResponse, LlmError>,
    C: FnMut(&Table) -> std::result::Result<(), StoreError>,
{
    if plan.batch_size == 0 {
        return Err(PipelineError::InvalidPlan(format!(
            "{}: batch size must be at least 1",
            plan.name
        )));
    }
    ensure_output_columns(&mut table, plan);

    let pending = unresolved_rows(&table, &plan.target_column, &plan.valid_labels);
    let mut report = RunReport {
        considered: pending.len(),
        ..RunReport::default()
    };
    let total_batches = pending.len().div_ceil(plan.batch_size);
    info!(
        stage = %plan.name,
        rows = pending.len(),
        batches = total_batches,
        "starting classification"
    );

    let mut checkpointed_last = false;
    for (position, ids) in pending.chunks(plan.batch_size).enumerate() {
        let number = position + 1;
        let items: Vec<BatchItem> = ids
            .iter()
            .map(|&id| BatchItem {
                id,
                text: table.get(id, &plan.input_column).to_string(),
            })
            .collect();
        let prompt = plan.template.encode(&items);
        debug!(stage = %plan.name, batch = number, chars = prompt.len(), "sending batch");

        match invoke(&prompt) {
            Ok(response) => {
                report.prompt_tokens += u64::from(response.prompt_tokens);
                report.completion_tokens += u64::from(response.completion_tokens);
                let outcome = plan.schema.parse_response(&response.content, ids);
                merge_result(&mut table, plan, &outcome.result);
                report.resolved += outcome.matched;
                info!(
                    stage = %plan.name,
                    batch = number,
                    of = total_batches,
                    matched = outcome.matched,
                    size = ids.len(),
                    "batch classified"
                );
            }
            Err(err) => {
                report.failed_batches += 1;
                warn!(
                    stage = %plan.name,
                    batch = number,
                    of = total_batches,
                    transport = err.is_transport(),
                    "batch failed, rows stay unresolved: {err}"
                );
            }
        }
        report.batches = number;

        checkpointed_last = false;
        if settings.checkpoint_every > 0 && number % settings.checkpoint_every == 0 {
            write_checkpoint(&table, &mut checkpoint, &mut report, plan)?;
            checkpointed_last = true;
        }
        throttle(settings.delay);
    }

    if report.batches > 0 && !checkpointed_last {
        write_checkpoint(&table, &mut checkpoint, &mut report, plan)?;
    }

    report.unresolved = unresolved_rows(&table, &plan.target_column, &plan.valid_labels).len();
    info!(
        stage = %plan.name,
        considered = report.considered,
        resolved = report.resolved,
        unresolved = report.unresolved,
        failed = report.failed_batches,
        "classification finished"
    );
    Ok((table, report))
}

fn ensure_output_columns(table: &mut Table, plan: &ClassificationPlan) {
    table.ensure_column(&plan.input_column);
    table.ensure_column(&plan.target_column);
    for field in plan.schema.fields() {
        table.ensure_column(field.column());
    }
    if let Some(column) = plan.schema.rationale_column() {
        table.ensure_column(column);
    }
    if let Some(column) = plan.schema.raw_column() {
        table.ensure_column(column);
    }
    table.ensure_column(&plan.timestamp_column);
}

fn merge_result(table: &mut Table, plan: &ClassificationPlan, result: &ClassificationResult) {
    let stamp = now_stamp();
    for (id, line) in result.iter() {
        for (column, value) in &line.values {
            table.set(id, column, value.as_str());
        }
        if let (Some(column), Some(rationale)) = (plan.schema.rationale_column(), &line.rationale) {
            table.set(id, column, rationale.as_str());
        }
        if let Some(column) = plan.schema.raw_column() {
            table.set(id, column, line.raw.as_str());
        }
        table.set(id, &plan.timestamp_column, stamp.as_str());
    }
}

fn write_checkpoint<C>(
    table: &Table,
    checkpoint: &mut C,
    report: &mut RunReport,
    plan: &ClassificationPlan,
) -> Result<()>
where
    C: FnMut(&Table) -> std::result::Result<(), StoreError>,
{
    checkpoint(table)?;
    report.checkpoints += 1;
    info!(stage = %plan.name, batch = report.batches, "checkpoint written");
    Ok(())
}

fn throttle(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
