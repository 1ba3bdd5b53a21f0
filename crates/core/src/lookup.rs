use std::collections::HashMap;

use eiweet_sheets::Table;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::catalog::{
    FIRST_PASS, INGREDIENT, INGREDIENTS_CLEAN, INGREDIENT_GROUP, INGREDIENT_RATIONALE,
    MANUAL_REVIEW, ORIGIN, PROTEIN_ROLE, PROTEIN_SOURCES, VENDOR_LABEL_STANDARD,
};
use crate::master::ingredient_key;

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ ,]").unwrap());

/// Master list as `ingredient → (role, origin)`, all keys and values lowercase.
#[derive(Debug, Clone, Default)]
pub struct IngredientLookup {
    entries: HashMap<String, (String, String)>,
}

impl IngredientLookup {
    pub fn from_master(master: &Table) -> Self {
        let entries = (0..master.len())
            .map(|idx| {
                (
                    ingredient_key(master.get(idx, INGREDIENT)),
                    (
                        master.get(idx, PROTEIN_ROLE).trim().to_lowercase(),
                        master.get(idx, ORIGIN).trim().to_lowercase(),
                    ),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Protein sources named in a cleaned ingredient list.
    pub fn evidence(&self, clean: &str) -> Evidence {
        let mut evidence = Evidence::default();
        let lower = clean.to_lowercase();
        for token in TOKEN_SPLIT.split(&lower).map(str::trim) {
            if token.chars().count() <= 2 {
                continue;
            }
            let Some((role, origin)) = self.entries.get(&ingredient_key(token)) else {
                continue;
            };
            if role != "wel" {
                continue;
            }
            let name = capitalize(token);
            if origin.contains("plantaardig") {
                push_unique(&mut evidence.plant, name);
            } else if origin.contains("dierlijk") {
                push_unique(&mut evidence.animal, name);
            }
        }
        evidence
    }
}

/// Plant and animal protein sources found in one product, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pub plant: Vec<String>,
    pub animal: Vec<String>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.plant.is_empty() && self.animal.is_empty()
    }

    pub fn group(&self) -> Option<&'static str> {
        match (self.plant.is_empty(), self.animal.is_empty()) {
            (false, false) => Some("Combinatie"),
            (false, true) => Some("Plantaardig"),
            (true, false) => Some("Dierlijk"),
            (true, true) => None,
        }
    }

    pub fn rationale(&self) -> String {
        match (self.plant.first(), self.animal.first()) {
            (Some(plant), Some(animal)) => {
                format!("{plant} is plantaardig en {animal} is dierlijk.")
            }
            (Some(_), None) => format!(
                "Bevat plantaardige bron(nen): {}.",
                self.plant.join(", ")
            ),
            (None, Some(_)) => format!(
                "Bevat dierlijke bron(nen): {}.",
                self.animal.join(", ")
            ),
            (None, None) => String::new(),
        }
    }

    pub fn sources(&self) -> String {
        self.plant
            .iter()
            .chain(self.animal.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub products: usize,
    pub grouped: usize,
    pub manual_review: usize,
}

/// Derives an ingredient-based protein group per product and flags rows
/// where the supermarket disagrees with both the AI verdict and that group.
/// Products without any known protein source keep their previous values.
pub fn check_ingredients(products: &mut Table, lookup: &IngredientLookup) -> CheckReport {
    let mut report = CheckReport {
        products: products.len(),
        ..CheckReport::default()
    };
    for column in [INGREDIENT_GROUP, PROTEIN_SOURCES, INGREDIENT_RATIONALE, MANUAL_REVIEW] {
        products.ensure_column(column);
    }
    for idx in 0..products.len() {
        let evidence = lookup.evidence(products.get(idx, INGREDIENTS_CLEAN));
        if let Some(group) = evidence.group() {
            products.set(idx, INGREDIENT_GROUP, group);
            products.set(idx, PROTEIN_SOURCES, evidence.sources());
            products.set(idx, INGREDIENT_RATIONALE, evidence.rationale());
            report.grouped += 1;
        }
        let vendor = products.get(idx, VENDOR_LABEL_STANDARD);
        let manual = vendor != products.get(idx, FIRST_PASS)
            && vendor != products.get(idx, INGREDIENT_GROUP);
        products.set(idx, MANUAL_REVIEW, if manual { "Ja" } else { "Nee" });
        if manual {
            report.manual_review += 1;
        }
    }
    info!(
        products = report.products,
        grouped = report.grouped,
        manual_review = report.manual_review,
        "ingredient check finished"
    );
    report
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VENDOR;

    fn master() -> Table {
        let mut table = Table::new([INGREDIENT, PROTEIN_ROLE, ORIGIN]);
        for (name, role, origin) in [
            ("kikkererwten", "Wel", "Plantaardig"),
            ("Melk", "wel", "Dierlijk"),
            ("ei", "Wel", "Dierlijk"),
            ("water", "Niet", "Niet relevant"),
            ("soja", "Onbekend", ""),
        ] {
            table.push_row([
                (INGREDIENT, name.to_string()),
                (PROTEIN_ROLE, role.to_string()),
                (ORIGIN, origin.to_string()),
            ]);
        }
        table
    }

    fn product(table: &mut Table, clean: &str, vendor_label: &str, verdict: &str) {
        table.push_row([
            (VENDOR, "AH".to_string()),
            (INGREDIENTS_CLEAN, clean.to_string()),
            (VENDOR_LABEL_STANDARD, vendor_label.to_string()),
            (FIRST_PASS, verdict.to_string()),
        ]);
    }

    #[test]
    fn evidence_is_deduplicated_in_first_seen_order() {
        let lookup = IngredientLookup::from_master(&master());
        let evidence = lookup.evidence("MELK kikkererwten water melk,soja ei");
        assert_eq!(evidence.plant, vec!["Kikkererwten"]);
        assert_eq!(evidence.animal, vec!["Melk"]);
        assert_eq!(evidence.group(), Some("Combinatie"));
        assert_eq!(evidence.sources(), "Kikkererwten, Melk");
        assert_eq!(
            evidence.rationale(),
            "Kikkererwten is plantaardig en Melk is dierlijk."
        );
    }

    #[test]
    fn short_tokens_are_ignored() {
        let lookup = IngredientLookup::from_master(&master());
        assert!(lookup.evidence("ei water").is_empty());
    }

    #[test]
    fn check_sets_group_and_manual_review_flags() {
        let lookup = IngredientLookup::from_master(&master());
        let mut products = Table::new([VENDOR]);
        product(&mut products, "kikkererwten water", "Plantaardig", "Dierlijk");
        product(&mut products, "water suiker", "Dierlijk", "Plantaardig");
        product(&mut products, "melk melk", "Plantaardig", "Plantaardig");

        let report = check_ingredients(&mut products, &lookup);
        assert_eq!(
            report,
            CheckReport {
                products: 3,
                grouped: 2,
                manual_review: 1
            }
        );
        assert_eq!(products.get(0, INGREDIENT_GROUP), "Plantaardig");
        assert_eq!(
            products.get(0, INGREDIENT_RATIONALE),
            "Bevat plantaardige bron(nen): Kikkererwten."
        );
        assert_eq!(products.get(0, MANUAL_REVIEW), "Nee");
        assert_eq!(products.get(1, INGREDIENT_GROUP), "");
        assert_eq!(products.get(1, MANUAL_REVIEW), "Ja");
        assert_eq!(products.get(2, PROTEIN_SOURCES), "Melk");
        assert_eq!(products.get(2, MANUAL_REVIEW), "Nee");
    }
}
