use anyhow::{Context, Result};
use eiweet_core::catalog::{INGREDIENT, ORIGIN, ORIGIN_DATE, PROTEIN_ROLE, SOURCE_PRODUCT};
use eiweet_core::{
    check_ingredients as check_products, classify_unresolved, clean_products,
    discover_ingredients, flag_reviews, write_vendor_reports, CheckReport, ClassificationPlan,
    IngredientLookup, ReportSummary, RunReport,
};
use eiweet_llm::{LlmError, LlmResponse};
use eiweet_sheets::{StoreError, Table, TableStore};
use tracing::info;

use crate::config::PipelineConfig;

/// One completion call per prompt.
pub type Invoke<'a> = &'a dyn Fn(&str) -> Result<LlmResponse, LlmError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepSummary {
    pub products: usize,
    pub added: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSummary {
    pub run: RunReport,
    pub flagged: usize,
}

/// Sanitizes every product's ingredient list and grows the master list.
pub fn prep(store: &dyn TableStore, config: &PipelineConfig) -> Result<PrepSummary> {
    let sanitizer = config.sanitizer()?;
    let products = load(store, &config.sheets.products)?;
    let cleaned = clean_products(&products, &sanitizer);
    store
        .replace(&config.sheets.products, &cleaned)
        .context("failed to save cleaned products")?;

    let mut master = match store.load(&config.sheets.master) {
        Ok(table) => table,
        Err(StoreError::SheetNotFound(_)) => {
            info!(sheet = %config.sheets.master, "master list missing, starting an empty one");
            Table::new([INGREDIENT, PROTEIN_ROLE, ORIGIN, ORIGIN_DATE, SOURCE_PRODUCT])
        }
        Err(err) => return Err(err).context("failed to load master list"),
    };
    let added = discover_ingredients(&mut master, &cleaned);
    if added > 0 {
        store
            .replace(&config.sheets.master, &master)
            .context("failed to save master list")?;
    }
    Ok(PrepSummary {
        products: cleaned.len(),
        added,
    })
}

pub fn classify_ingredients(
    store: &dyn TableStore,
    config: &PipelineConfig,
    invoke: Invoke<'_>,
) -> Result<RunReport> {
    let mut plan = ClassificationPlan::ingredient_master()?;
    plan.batch_size = config.batches.master;
    let (_, report) = classify_sheet(store, config, &config.sheets.master, &plan, invoke)?;
    Ok(report)
}

/// First-pass verdicts, then the supermarket comparison over all products.
pub fn classify_products(
    store: &dyn TableStore,
    config: &PipelineConfig,
    invoke: Invoke<'_>,
) -> Result<ProductSummary> {
    let mut plan = ClassificationPlan::product_first_pass(&config.parser.rationale_labels)?;
    plan.batch_size = config.batches.products;
    let (mut table, run) =
        classify_sheet(store, config, &config.sheets.products, &plan, invoke)?;
    let flagged = flag_reviews(&mut table);
    store
        .replace(&config.sheets.products, &table)
        .context("failed to save review flags")?;
    Ok(ProductSummary { run, flagged })
}

pub fn check_ingredients(store: &dyn TableStore, config: &PipelineConfig) -> Result<CheckReport> {
    let master = load(store, &config.sheets.master)?;
    let lookup = IngredientLookup::from_master(&master);
    let mut products = load(store, &config.sheets.products)?;
    let report = check_products(&mut products, &lookup);
    store
        .replace(&config.sheets.products, &products)
        .context("failed to save ingredient check")?;
    Ok(report)
}

pub fn reports(store: &dyn TableStore, config: &PipelineConfig) -> Result<ReportSummary> {
    let products = load(store, &config.sheets.products)?;
    Ok(write_vendor_reports(&products, store))
}

fn classify_sheet(
    store: &dyn TableStore,
    config: &PipelineConfig,
    sheet: &str,
    plan: &ClassificationPlan,
    invoke: Invoke<'_>,
) -> Result<(Table, RunReport)> {
    let table = load(store, sheet)?;
    classify_unresolved(table, plan, &config.batch_settings(), invoke, |snapshot| {
        store.replace(sheet, snapshot)
    })
    .with_context(|| format!("classification of {sheet} stopped"))
}

fn load(store: &dyn TableStore, sheet: &str) -> Result<Table> {
    store
        .load(sheet)
        .with_context(|| format!("failed to load {sheet} from {}", store.location()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eiweet_core::catalog::{
        FIRST_PASS, INGREDIENTS, INGREDIENTS_CLEAN, INGREDIENT_GROUP, MANUAL_REVIEW,
        PRODUCT_NAME, REVIEW_NEEDED, VENDOR, VENDOR_LABEL,
    };
    use eiweet_sheets::MemoryWorkbook;

    fn config() -> PipelineConfig {
        PipelineConfig {
            delay_ms: 0,
            ..PipelineConfig::default()
        }
    }

    fn workbook() -> MemoryWorkbook {
        let config = config();
        let mut products = Table::new([PRODUCT_NAME, VENDOR, INGREDIENTS, VENDOR_LABEL]);
        for (name, vendor, ingredients, label) in [
            (
                "Hummus",
                "Albert Heijn",
                "Ingrediënten: kikkererwten (60%), water",
                "Plantaardig",
            ),
            ("Lasagne", "Jumbo", "pasta, kaas, spinazie", "Dierlijk"),
            ("", "Jumbo", "water", ""),
        ] {
            products.push_row([
                (PRODUCT_NAME, name.to_string()),
                (VENDOR, vendor.to_string()),
                (INGREDIENTS, ingredients.to_string()),
                (VENDOR_LABEL, label.to_string()),
            ]);
        }
        let mut master = Table::new([INGREDIENT, PROTEIN_ROLE, ORIGIN]);
        master.push_row([
            (INGREDIENT, "water".to_string()),
            (PROTEIN_ROLE, "Niet".to_string()),
            (ORIGIN, "Niet relevant".to_string()),
        ]);
        MemoryWorkbook::new()
            .with_sheet(&config.sheets.products, products)
            .with_sheet(&config.sheets.master, master)
    }

    /// Answers every item line with a fixed verdict keyed on the item text.
    fn stub_llm(prompt: &str) -> Result<LlmResponse, LlmError> {
        let mut lines = Vec::new();
        for line in prompt.lines() {
            let Some(rest) = line.strip_prefix("ID:") else {
                continue;
            };
            let Some((id, item)) = rest.split_once(" | ") else {
                continue;
            };
            if item.starts_with("Ingr:") {
                let origin = if item.contains("kaas") { "Dierlijk" } else { "Plantaardig" };
                lines.push(format!("ID:{id} | rol:Wel | type:{origin}"));
            } else if item.starts_with("Product:") {
                let verdict = if item.contains("Lasagne") { "Combinatie" } else { "Plantaardig" };
                lines.push(format!("ID:{id} | oordeel:{verdict} | rationale:stub"));
            }
        }
        Ok(LlmResponse::text(lines.join("\n")))
    }

    #[test]
    fn prep_cleans_products_and_extends_master() {
        let book = workbook();
        let summary = prep(&book, &config()).unwrap();
        assert_eq!(summary, PrepSummary { products: 2, added: 4 });
        let products = book.sheet(&config().sheets.products).unwrap();
        assert_eq!(products.get(0, INGREDIENTS_CLEAN), "kikkererwten () water");
        let master = book.sheet(&config().sheets.master).unwrap();
        let names: Vec<&str> = master.column_values(INGREDIENT).collect();
        assert_eq!(names, vec!["water", "kikkererwten", "pasta", "kaas", "spinazie"]);
    }

    #[test]
    fn prep_starts_a_master_list_when_missing() {
        let config = config();
        let mut products = Table::new([PRODUCT_NAME, INGREDIENTS]);
        products.push_row([
            (PRODUCT_NAME, "Tofu".to_string()),
            (INGREDIENTS, "sojabonen".to_string()),
        ]);
        let book = MemoryWorkbook::new().with_sheet(&config.sheets.products, products);
        let summary = prep(&book, &config).unwrap();
        assert_eq!(summary.added, 1);
        assert!(book.sheet(&config.sheets.master).is_some());
    }

    #[test]
    fn full_stage_sequence_produces_review_columns_and_reports() {
        let book = workbook();
        let config = config();
        prep(&book, &config).unwrap();

        let master_run = classify_ingredients(&book, &config, &stub_llm).unwrap();
        assert_eq!(master_run.considered, 4);
        assert_eq!(master_run.unresolved, 0);

        let products = classify_products(&book, &config, &stub_llm).unwrap();
        assert_eq!(products.run.resolved, 2);
        assert_eq!(products.flagged, 1);

        let check = check_ingredients(&book, &config).unwrap();
        assert_eq!(check.grouped, 2);

        let table = book.sheet(&config.sheets.products).unwrap();
        assert_eq!(table.get(0, FIRST_PASS), "Plantaardig");
        assert_eq!(table.get(0, REVIEW_NEEDED), "nee");
        assert_eq!(table.get(1, REVIEW_NEEDED), "ja");
        assert_eq!(table.get(1, INGREDIENT_GROUP), "Combinatie");
        assert_eq!(table.get(1, MANUAL_REVIEW), "Ja");

        let summary = reports(&book, &config).unwrap();
        assert_eq!(summary.written, vec!["Albert Heijn", "Jumbo"]);
        assert!(book.sheet("Rapport_Albert_Heijn").is_some());
    }

    #[test]
    fn rerunning_a_classification_sends_nothing() {
        let book = workbook();
        let config = config();
        prep(&book, &config).unwrap();
        classify_ingredients(&book, &config, &stub_llm).unwrap();
        let writes = book.writes(&config.sheets.master);
        let silent = |_: &str| -> Result<LlmResponse, LlmError> { panic!("nothing should be sent") };
        let again = classify_ingredients(&book, &config, &silent).unwrap();
        assert_eq!(again.considered, 0);
        assert_eq!(book.writes(&config.sheets.master), writes);
    }

    #[test]
    fn missing_products_sheet_stops_the_stage() {
        let book = MemoryWorkbook::new();
        let err = check_ingredients(&book, &config()).unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }
}
