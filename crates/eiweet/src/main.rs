mod cli;
mod config;
mod logging;
mod run;
mod stages;

use anyhow::{Context, Result};
use clap::Parser;
use eiweet_core::{CheckReport, ReportSummary, RunReport};
use eiweet_sheets::TableStore;
use tokio::runtime::Runtime;

use crate::cli::{Cli, Command};
use crate::config::{LlmSettings, PipelineConfig};
use crate::stages::{Invoke, PrepSummary, ProductSummary};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose || logging::env_flag());
    let config = PipelineConfig::load(&cli.config)?;
    let store = config.store.open()?;
    let store = store.as_ref();
    match cli.command {
        Command::Prep => prep(store, &config),
        Command::ClassifyIngredients => {
            with_llm(|invoke| classify_ingredients(store, &config, invoke))
        }
        Command::ClassifyProducts => with_llm(|invoke| classify_products(store, &config, invoke)),
        Command::CheckIngredients => check_ingredients(store, &config),
        Command::Reports => reports(store, &config),
        Command::Run { reports: with_reports } => with_llm(|invoke| {
            run::run_pipeline(
                with_reports,
                || prep(store, &config),
                || classify_ingredients(store, &config, invoke),
                || classify_products(store, &config, invoke),
                || check_ingredients(store, &config),
                || reports(store, &config),
            )
        }),
    }
}

/// Builds the completion client and hands stages a blocking call into it.
fn with_llm<T>(body: impl FnOnce(Invoke<'_>) -> Result<T>) -> Result<T> {
    let client = LlmSettings::from_env()?.client()?;
    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    let invoke = |prompt: &str| runtime.block_on(client.complete(prompt));
    body(&invoke)
}

fn prep(store: &dyn TableStore, config: &PipelineConfig) -> Result<()> {
    let PrepSummary { products, added } = stages::prep(store, config)?;
    println!("prep: {products} products cleaned, {added} new ingredients added to the master list");
    Ok(())
}

fn classify_ingredients(
    store: &dyn TableStore,
    config: &PipelineConfig,
    invoke: Invoke<'_>,
) -> Result<()> {
    let report = stages::classify_ingredients(store, config, invoke)?;
    print_run("ingredients", &report);
    Ok(())
}

fn classify_products(
    store: &dyn TableStore,
    config: &PipelineConfig,
    invoke: Invoke<'_>,
) -> Result<()> {
    let ProductSummary { run, flagged } = stages::classify_products(store, config, invoke)?;
    print_run("products", &run);
    println!("products: {flagged} products differ from the supermarket label (Review nodig = ja)");
    Ok(())
}

fn check_ingredients(store: &dyn TableStore, config: &PipelineConfig) -> Result<()> {
    let CheckReport {
        products,
        grouped,
        manual_review,
    } = stages::check_ingredients(store, config)?;
    println!(
        "check: {grouped}/{products} products grouped by ingredient, {manual_review} need manual review"
    );
    Ok(())
}

fn reports(store: &dyn TableStore, config: &PipelineConfig) -> Result<()> {
    let ReportSummary { written, failed } = stages::reports(store, config)?;
    if written.is_empty() && failed.is_empty() {
        println!("reports: no supermarkets found in the products sheet");
        return Ok(());
    }
    println!("reports: {} written ({})", written.len(), written.join(", "));
    if !failed.is_empty() {
        println!("reports: {} failed ({})", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn print_run(stage: &str, report: &RunReport) {
    println!(
        "{stage}: {} considered, {} resolved, {} still unresolved ({} of {} batches failed, {} checkpoints, {} prompt + {} completion tokens)",
        report.considered,
        report.resolved,
        report.unresolved,
        report.failed_batches,
        report.batches,
        report.checkpoints,
        report.prompt_tokens,
        report.completion_tokens
    );
}
