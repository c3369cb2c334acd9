//! Cell representation for XLS files

use crate::common::cell::{CellValue, cell_reference};

/// A decoded cell with its position and XF index.
#[derive(Debug, Clone, PartialEq)]
pub struct XlsCell {
    row: u32,
    col: u32,
    xf_index: u16,
    value: CellValue,
    is_formula: bool,
}

impl XlsCell {
    /// Create a new XLS cell
    pub fn new(row: u32, col: u32, xf_index: u16, value: CellValue) -> Self {
        XlsCell {
            row,
            col,
            xf_index,
            value,
            is_formula: false,
        }
    }

    /// Create a cell holding a formula's cached result
    pub fn formula(row: u32, col: u32, xf_index: u16, value: CellValue) -> Self {
        XlsCell {
            is_formula: true,
            ..XlsCell::new(row, col, xf_index, value)
        }
    }

    /// Zero-based row.
    #[inline]
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column.
    #[inline]
    pub fn column(&self) -> u32 {
        self.col
    }

    #[inline]
    pub fn xf_index(&self) -> u16 {
        self.xf_index
    }

    #[inline]
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut CellValue {
        &mut self.value
    }

    pub fn into_value(self) -> CellValue {
        self.value
    }

    #[inline]
    pub fn is_formula(&self) -> bool {
        self.is_formula
    }

    /// A1-style reference such as `"C7"`.
    pub fn coordinate(&self) -> String {
        cell_reference(self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_and_accessors() {
        let cell = XlsCell::new(6, 2, 15, CellValue::Number(1.0));
        assert_eq!(cell.coordinate(), "C7");
        assert_eq!(cell.xf_index(), 15);
        assert!(!cell.is_formula());
        assert!(XlsCell::formula(0, 0, 0, CellValue::Empty).is_formula());
    }
}
