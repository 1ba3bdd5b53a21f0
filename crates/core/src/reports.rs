use eiweet_sheets::{Table, TableStore};
use itertools::Itertools;
use tracing::{info, warn};

use crate::catalog::VENDOR;

const TAB_PREFIX: &str = "Rapport_";
const MAX_TAB_CHARS: usize = 31;

/// Distinct non-blank vendors, in the order they first appear.
pub fn vendors(products: &Table) -> Vec<String> {
    products
        .column_values(VENDOR)
        .filter(|vendor| !vendor.trim().is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}

/// `Rapport_<vendor>` with spaces as underscores, at most 31 characters.
pub fn report_tab_name(vendor: &str) -> String {
    format!("{TAB_PREFIX}{}", vendor.replace(' ', "_"))
        .chars()
        .take(MAX_TAB_CHARS)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub written: Vec<String>,
    pub failed: Vec<String>,
}

/// Writes each vendor's rows to its own tab. A vendor whose tab cannot be
/// written is logged and skipped.
pub fn write_vendor_reports<S: TableStore + ?Sized>(products: &Table, store: &S) -> ReportSummary {
    let mut summary = ReportSummary::default();
    let all = vendors(products);
    for (position, vendor) in all.iter().enumerate() {
        let rows = products.filter_rows(|idx, table| table.get(idx, VENDOR) == vendor);
        let tab = report_tab_name(vendor);
        info!(
            vendor = %vendor,
            tab = %tab,
            rows = rows.len(),
            "writing report {}/{}",
            position + 1,
            all.len()
        );
        match store.replace(&tab, &rows) {
            Ok(()) => summary.written.push(vendor.clone()),
            Err(err) => {
                warn!(vendor = %vendor, "report skipped: {err}");
                summary.failed.push(vendor.clone());
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PRODUCT_NAME;
    use eiweet_sheets::{MemoryWorkbook, Result as StoreResult, StoreError};

    fn products() -> Table {
        let mut table = Table::new([PRODUCT_NAME, VENDOR]);
        for (name, vendor) in [
            ("Tofu", "Albert Heijn"),
            ("Kaas", "Jumbo"),
            ("Melk", ""),
            ("Hummus", "Albert Heijn"),
            ("Seitan", "  "),
        ] {
            table.push_row([(PRODUCT_NAME, name.to_string()), (VENDOR, vendor.to_string())]);
        }
        table
    }

    #[test]
    fn vendors_are_distinct_in_first_seen_order() {
        assert_eq!(vendors(&products()), vec!["Albert Heijn", "Jumbo"]);
    }

    #[test]
    fn tab_names_are_sheet_safe() {
        assert_eq!(report_tab_name("Albert Heijn"), "Rapport_Albert_Heijn");
        let long = report_tab_name("Een hele lange supermarktnaam met extra");
        assert_eq!(long.chars().count(), 31);
        assert!(long.starts_with("Rapport_Een_hele"));
    }

    #[test]
    fn each_vendor_gets_its_own_tab() {
        let book = MemoryWorkbook::new();
        let summary = write_vendor_reports(&products(), &book);
        assert_eq!(summary.written, vec!["Albert Heijn", "Jumbo"]);
        let ah = book.sheet("Rapport_Albert_Heijn").unwrap();
        assert_eq!(ah.len(), 2);
        assert_eq!(ah.columns(), products().columns());
        assert_eq!(book.sheet("Rapport_Jumbo").unwrap().get(0, PRODUCT_NAME), "Kaas");
    }

    struct RefusingStore;

    impl TableStore for RefusingStore {
        fn load(&self, sheet: &str) -> StoreResult<Table> {
            Err(StoreError::SheetNotFound(sheet.to_string()))
        }

        fn replace(&self, sheet: &str, _table: &Table) -> StoreResult<()> {
            if sheet.contains("Jumbo") {
                Err(StoreError::Http {
                    status: 500,
                    body: "quota".into(),
                })
            } else {
                Ok(())
            }
        }

        fn location(&self) -> String {
            "refusing".into()
        }
    }

    #[test]
    fn failing_vendor_is_skipped() {
        let summary = write_vendor_reports(&products(), &RefusingStore);
        assert_eq!(summary.written, vec!["Albert Heijn"]);
        assert_eq!(summary.failed, vec!["Jumbo"]);
    }
}
