use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::table::Table;
use crate::TableStore;

/// Workbook kept as a directory with one `<sheet>.csv` per worksheet.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Connection {
                location: root.display().to_string(),
                reason: "workbook directory does not exist".to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.root.join(format!("{}.csv", sheet_file_stem(sheet)))
    }
}

impl TableStore for CsvWorkbook {
    fn load(&self, sheet: &str) -> Result<Table> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Err(StoreError::SheetNotFound(sheet.to_string()));
        }
        let file = File::open(&path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        let headers = reader
            .headers()?
            .iter()
            .map(|cell| cell.to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        debug!(sheet, rows = rows.len(), path = %path.display(), "loaded worksheet");
        Ok(Table::from_rows(headers, rows))
    }

    fn replace(&self, sheet: &str, table: &Table) -> Result<()> {
        let path = self.sheet_path(sheet);
        let mut temp = NamedTempFile::new_in(&self.root)?;
        {
            let mut writer = WriterBuilder::new()
                .flexible(false)
                .from_writer(temp.as_file_mut());
            writer.write_record(table.columns())?;
            for row in table.rows() {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        temp.as_file_mut().flush()?;
        temp.persist(&path).map_err(|err| StoreError::Io(err.error))?;
        debug!(sheet, rows = table.len(), path = %path.display(), "replaced worksheet");
        Ok(())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// Sheet names become file names; path separators are not allowed in either.
fn sheet_file_stem(sheet: &str) -> String {
    sheet
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_fails_with_connection_error_for_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = CsvWorkbook::open(&missing).unwrap_err();
        assert!(matches!(err, StoreError::Connection { .. }));
    }

    #[test]
    fn load_reads_header_and_rows() {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("Producten Input.csv")).unwrap();
        writeln!(file, "Productnaam,Supermarkt").unwrap();
        writeln!(file, "Tofu,AH").unwrap();
        writeln!(file, "Kaas").unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        let table = book.load("Producten Input").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Supermarkt"), "AH");
        assert_eq!(table.get(1, "Supermarkt"), "");
    }

    #[test]
    fn load_reports_missing_sheet() {
        let dir = tempdir().unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        assert!(matches!(
            book.load("Ingredienten Database"),
            Err(StoreError::SheetNotFound(_))
        ));
    }

    #[test]
    fn replace_writes_whole_table_and_creates_sheet() {
        let dir = tempdir().unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        let mut table = Table::new(["Ingredient", "Classificatie"]);
        table.push_row([
            ("Ingredient", "erwten, gepeld".to_string()),
            ("Classificatie", "Plantaardig".to_string()),
        ]);
        book.replace("Rapport_AH", &table).unwrap();
        let reloaded = book.load("Rapport_AH").unwrap();
        assert_eq!(reloaded, table);
        assert!(book.sheet_path("Rapport_AH").is_file());
    }

    #[test]
    fn replace_overwrites_previous_contents() {
        let dir = tempdir().unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        let mut table = Table::new(["a"]);
        table.push_row([("a", "1".to_string())]);
        table.push_row([("a", "2".to_string())]);
        book.replace("s", &table).unwrap();
        let smaller = Table::new(["a"]);
        book.replace("s", &smaller).unwrap();
        assert!(book.load("s").unwrap().is_empty());
    }
}
