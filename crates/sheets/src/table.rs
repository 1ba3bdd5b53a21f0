
/// In-memory worksheet: a header row plus text cells addressed by position.
///
/// Row ids are positions in `rows` and are only stable for the lifetime of
/// one loaded value. Reloading a sheet re-derives them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from a header and raw rows, padding short rows and
    /// widening the header when a row is longer than it.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0)
            .max(columns.len());
        let mut columns = columns;
        while columns.len() < width {
            columns.push(format!("column_{}", columns.len() + 1));
        }
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Appends an empty column unless it already exists.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.columns.len() - 1
    }

    /// Cell text, `""` for unknown rows or columns.
    pub fn get(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|col| self.rows.get(row).and_then(|cells| cells.get(col)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Writes a cell, adding the column when needed. Out-of-range rows are ignored.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) {
        if row >= self.rows.len() {
            return;
        }
        let col = self.ensure_column(column);
        self.rows[row][col] = value.into();
    }

    /// Appends a row from `(column, value)` pairs; unknown columns are created.
    pub fn push_row<'a, I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut row = vec![String::new(); self.columns.len()];
        for (column, value) in cells {
            let col = self.ensure_column(column);
            if row.len() < self.columns.len() {
                row.resize(self.columns.len(), String::new());
            }
            row[col] = value;
        }
        self.rows.push(row);
    }

    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a str> + 'a {
        let col = self.column_index(column);
        self.rows.iter().map(move |row| {
            col.and_then(|idx| row.get(idx))
                .map(String::as_str)
                .unwrap_or("")
        })
    }

    /// Copy of the rows matching `keep`, with the full schema.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize, &Table) -> bool,
    {
        let rows = (0..self.rows.len())
            .filter(|&idx| keep(idx, self))
            .map(|idx| self.rows[idx].clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Header followed by every row, the layout spreadsheet writes expect.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.columns.clone());
        grid.extend(self.rows.iter().cloned());
        grid
    }

    /// Inverse of [`Table::to_grid`]; an empty grid is an empty table.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let columns = grid.remove(0);
        Self::from_rows(columns, grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["Ingredient", "Classificatie"]);
        table.push_row([("Ingredient", "melk".to_string())]);
        table.push_row([
            ("Ingredient", "soja".to_string()),
            ("Classificatie", "Plantaardig".to_string()),
        ]);
        table
    }

    #[test]
    fn get_and_set_address_cells_by_position() {
        let mut table = sample();
        assert_eq!(table.get(1, "Classificatie"), "Plantaardig");
        assert_eq!(table.get(0, "Classificatie"), "");
        table.set(0, "Classificatie", "Dierlijk");
        assert_eq!(table.get(0, "Classificatie"), "Dierlijk");
        assert_eq!(table.get(7, "Ingredient"), "");
    }

    #[test]
    fn set_adds_missing_columns_for_every_row() {
        let mut table = sample();
        table.set(1, "Classificatie datum", "01-02-2025 10:00");
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.rows()[0].len(), 3);
        assert_eq!(table.get(0, "Classificatie datum"), "");
    }

    #[test]
    fn ensure_column_is_idempotent() {
        let mut table = sample();
        let first = table.ensure_column("Bron product");
        let second = table.ensure_column("Bron product");
        assert_eq!(first, second);
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn from_rows_pads_ragged_rows() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into()]],
        );
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.get(0, "b"), "");
        assert_eq!(table.get(1, "column_3"), "3");
    }

    #[test]
    fn grid_roundtrip_keeps_header_first() {
        let table = sample();
        let grid = table.to_grid();
        assert_eq!(grid[0], vec!["Ingredient", "Classificatie"]);
        assert_eq!(Table::from_grid(grid), table);
        assert!(Table::from_grid(Vec::new()).is_empty());
    }

    #[test]
    fn filter_rows_keeps_schema() {
        let table = sample();
        let filtered = table.filter_rows(|idx, t| t.get(idx, "Ingredient") == "soja");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.columns(), table.columns());
    }
}
