use eiweet_sheets::Table;

/// Row ids whose `column` is blank or holds something outside `valid`, in
/// table order.
///
/// Rows that already carry a valid label are never returned, which is what
/// makes re-running a classification stage safe.
pub fn unresolved_rows(table: &Table, column: &str, valid: &[String]) -> Vec<usize> {
    table
        .column_values(column)
        .enumerate()
        .filter(|(_, value)| {
            let value = value.trim();
            value.is_empty() || !valid.iter().any(|label| label == value)
        })
        .map(|(idx, _)| idx)
        .collect()
}
