use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "eiweet", about = "Protein-source validation for supermarket product sheets")]
pub struct Cli {
    #[arg(long, global = true, default_value = "eiweet.yaml")]
    pub config: PathBuf,
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clean ingredient lists and add unknown ingredients to the master list.
    Prep,
    /// Classify unresolved master-list ingredients with the LLM.
    ClassifyIngredients,
    /// First-pass product verdicts with the LLM, then review flags.
    ClassifyProducts,
    /// Ingredient-based protein group and manual review flag per product.
    CheckIngredients,
    /// One report tab per supermarket.
    Reports,
    /// Prep, both classifications and the ingredient check in one go.
    Run {
        #[arg(long, default_value_t = false)]
        reports: bool,
    },
}
