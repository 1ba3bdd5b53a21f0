use eiweet_sheets::Table;
use tracing::info;

use crate::catalog::{FIRST_PASS, REVIEW_NEEDED, UNKNOWN, VENDOR_LABEL, VENDOR_LABEL_STANDARD};

/// Maps a free-form supermarket label onto the verdict vocabulary.
pub fn standardize_label(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.contains("combi") {
        "Combinatie"
    } else if lower.contains("plantaardig") {
        "Plantaardig"
    } else if lower.contains("dierlijk") {
        "Dierlijk"
    } else {
        UNKNOWN
    }
}

/// Fills the standardized supermarket label and `Review nodig` for every
/// product. Returns the number of rows flagged `ja`.
pub fn flag_reviews(products: &mut Table) -> usize {
    let mut flagged = 0;
    for idx in 0..products.len() {
        let standard = standardize_label(products.get(idx, VENDOR_LABEL));
        let verdict = products.get(idx, FIRST_PASS).trim();
        let needs_review = verdict.is_empty() || standard == UNKNOWN || verdict != standard;
        products.set(idx, VENDOR_LABEL_STANDARD, standard);
        products.set(idx, REVIEW_NEEDED, if needs_review { "ja" } else { "nee" });
        if needs_review {
            flagged += 1;
        }
    }
    info!(products = products.len(), flagged, "review flags updated");
    flagged
}
