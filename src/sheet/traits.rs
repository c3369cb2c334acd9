//! Traits for spreadsheet abstraction.

use crate::common::cell::{CellRange, CellValue};

/// Represents a worksheet (sheet) in a workbook.
///
/// Rows and columns are zero-based. Implementors only provide the name,
/// the used range and cell lookup; dense row access is derived from them.
pub trait Worksheet {
    /// Get the worksheet name.
    fn name(&self) -> &str;

    /// Range covered by cells that hold a value, `None` if there are none.
    fn dimensions(&self) -> Option<CellRange>;

    /// Value of the cell at `(row, column)`, if one is stored.
    fn cell_value(&self, row: u32, column: u32) -> Option<&CellValue>;

    /// Number of rows from row 0 through the last used row.
    fn row_count(&self) -> usize {
        self.dimensions().map_or(0, |r| r.last_row as usize + 1)
    }

    /// Number of columns from column 0 through the last used column.
    fn column_count(&self) -> usize {
        self.dimensions().map_or(0, |r| r.last_col as usize + 1)
    }

    /// One row padded with `Empty` to [`column_count`](Self::column_count).
    fn row(&self, row: u32) -> Vec<CellValue> {
        (0..self.column_count() as u32)
            .map(|col| self.cell_value(row, col).cloned().unwrap_or_default())
            .collect()
    }

    /// All rows as a dense grid.
    fn rows(&self) -> Vec<Vec<CellValue>> {
        (0..self.row_count() as u32).map(|row| self.row(row)).collect()
    }
}
