use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{Result, StoreError};
use crate::table::Table;
use crate::TableStore;

/// Workbook held in memory. Counts writes per sheet so checkpoint cadence
/// can be observed.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: RefCell<BTreeMap<String, Table>>,
    writes: RefCell<BTreeMap<String, usize>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, name: &str, table: Table) -> Self {
        self.sheets.borrow_mut().insert(name.to_string(), table);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<Table> {
        self.sheets.borrow().get(name).cloned()
    }

    pub fn writes(&self, name: &str) -> usize {
        self.writes.borrow().get(name).copied().unwrap_or(0)
    }
}

impl TableStore for MemoryWorkbook {
    fn load(&self, sheet: &str) -> Result<Table> {
        self.sheet(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))
    }

    fn replace(&self, sheet: &str, table: &Table) -> Result<()> {
        self.sheets
            .borrow_mut()
            .insert(sheet.to_string(), table.clone());
        *self.writes.borrow_mut().entry(sheet.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
