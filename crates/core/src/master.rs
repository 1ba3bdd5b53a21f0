use std::collections::HashSet;

use eiweet_sheets::Table;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::catalog::{
    INGREDIENT, INGREDIENTS, INGREDIENTS_CLEAN, ORIGIN_DATE, PRODUCT_NAME, PROTEIN_ROLE,
    SOURCE_PRODUCT, UNKNOWN,
};
use crate::sanitize::Sanitizer;
use crate::stamp::today_stamp;

/// Comparison key for ingredient text: NFC, lowercase, trimmed.
pub fn ingredient_key(text: &str) -> String {
    text.trim().nfc().collect::<String>().to_lowercase()
}

/// Words of a cleaned ingredient list worth looking up.
pub fn ingredient_tokens(clean: &str) -> impl Iterator<Item = &str> {
    clean
        .split(' ')
        .map(str::trim)
        .filter(|token| token.chars().count() > 2)
}

/// Drops products without a name and fills `Ingredients clean`.
pub fn clean_products(products: &Table, sanitizer: &Sanitizer) -> Table {
    let mut cleaned =
        products.filter_rows(|idx, table| !table.get(idx, PRODUCT_NAME).trim().is_empty());
    let dropped = products.len() - cleaned.len();
    cleaned.ensure_column(INGREDIENTS_CLEAN);
    for idx in 0..cleaned.len() {
        let clean = sanitizer.clean(cleaned.get(idx, INGREDIENTS));
        cleaned.set(idx, INGREDIENTS_CLEAN, clean);
    }
    debug!(products = cleaned.len(), dropped, "sanitized ingredient lists");
    cleaned
}

/// Appends every ingredient word of `products` that the master list does
/// not know yet. Returns how many rows were added.
pub fn discover_ingredients(master: &mut Table, products: &Table) -> usize {
    let mut known: HashSet<String> = master
        .column_values(INGREDIENT)
        .map(ingredient_key)
        .collect();
    let stamp = today_stamp();
    let mut added = 0;
    for idx in 0..products.len() {
        let product = products.get(idx, PRODUCT_NAME).to_string();
        let clean = products.get(idx, INGREDIENTS_CLEAN).to_string();
        for token in ingredient_tokens(&clean) {
            if !known.insert(ingredient_key(token)) {
                continue;
            }
            master.push_row([
                (INGREDIENT, token.to_string()),
                (PROTEIN_ROLE, UNKNOWN.to_string()),
                (ORIGIN_DATE, stamp.clone()),
                (SOURCE_PRODUCT, product.clone()),
            ]);
            added += 1;
        }
    }
    info!(added, master = master.len(), "master list discovery finished");
    added
}
