//! Batch LLM classification of spreadsheet rows and the deterministic
//! stages around it.

pub mod catalog;
mod classify;
mod error;
mod lookup;
mod master;
mod parse;
mod prompt;
mod reports;
mod review;
mod sanitize;
mod select;
mod stamp;

pub use classify::{
    classify_unresolved, BatchSettings, ClassificationPlan, RunReport, DEFAULT_BATCH_DELAY,
    DEFAULT_CHECKPOINT_EVERY,
};
pub use error::{PipelineError, Result};
pub use lookup::{check_ingredients, CheckReport, Evidence, IngredientLookup};
pub use master::{clean_products, discover_ingredients, ingredient_key, ingredient_tokens};
pub use parse::{
    ClassificationResult, FieldMatch, FieldSpec, KeywordVocabulary, ParseOutcome, ParsedLine,
    ResponseSchema, NO_RATIONALE,
};
pub use prompt::{BatchItem, PromptTemplate};
pub use reports::{report_tab_name, vendors, write_vendor_reports, ReportSummary};
pub use review::{flag_reviews, standardize_label};
pub use sanitize::{BracketPolicy, Sanitizer, DEFAULT_DIFFICULT_WORDS};
pub use select::unresolved_rows;
pub use stamp::{now_stamp, today_stamp, DATE_FORMAT, DATE_TIME_FORMAT};
