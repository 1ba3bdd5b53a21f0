use anyhow::Result;
use tracing::info;

/// Runs the stages in order, stopping at the first error. Vendor reports
/// only run when requested.
pub fn run_pipeline<FPrep, FIngredients, FProducts, FCheck, FReports>(
    with_reports: bool,
    mut prep_fn: FPrep,
    mut ingredients_fn: FIngredients,
    mut products_fn: FProducts,
    mut check_fn: FCheck,
    mut reports_fn: FReports,
) -> Result<()>
where
    FPrep: FnMut() -> Result<()>,
    FIngredients: FnMut() -> Result<()>,
    FProducts: FnMut() -> Result<()>,
    FCheck: FnMut() -> Result<()>,
    FReports: FnMut() -> Result<()>,
{
    info!(stage = "prep", "step 1/4: cleaning products and extending the master list");
    prep_fn()?;
    info!(stage = "ingredients", "step 2/4: classifying master-list ingredients");
    ingredients_fn()?;
    info!(stage = "products", "step 3/4: first-pass product verdicts");
    products_fn()?;
    info!(stage = "check", "step 4/4: ingredient-based check");
    check_fn()?;
    if with_reports {
        info!(stage = "reports", "writing vendor reports");
        reports_fn()?;
    }
    Ok(())
}
