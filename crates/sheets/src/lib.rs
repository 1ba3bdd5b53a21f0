//! Worksheet model and the workbook backends the pipeline reads and rewrites.

mod csv_store;
mod error;
mod memory;
mod sheets_api;
mod table;

pub use csv_store::CsvWorkbook;
pub use error::{Result, StoreError};
pub use memory::MemoryWorkbook;
pub use sheets_api::SheetsWorkbook;
pub use table::Table;

/// A workbook of named worksheets.
///
/// `replace` is one logical operation from the caller's side: the sheet is
/// cleared and the whole table written, creating the sheet when absent.
pub trait TableStore {
    fn load(&self, sheet: &str) -> Result<Table>;

    fn replace(&self, sheet: &str, table: &Table) -> Result<()>;

    /// Human-readable location used in log lines.
    fn location(&self) -> String;
}

impl<T: TableStore + ?Sized> TableStore for &T {
    fn load(&self, sheet: &str) -> Result<Table> {
        (**self).load(sheet)
    }

    fn replace(&self, sheet: &str, table: &Table) -> Result<()> {
        (**self).replace(sheet, table)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

impl<T: TableStore + ?Sized> TableStore for Box<T> {
    fn load(&self, sheet: &str) -> Result<Table> {
        (**self).load(sheet)
    }

    fn replace(&self, sheet: &str, table: &Table) -> Result<()> {
        (**self).replace(sheet, table)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
