//! Cell values and A1-style references shared by the `.xls` and `.xlsx` readers.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Spreadsheet error literal stored in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    Null,
    Div0,
    Value,
    Ref,
    Name,
    Num,
    NA,
    GettingData,
    /// Code not defined by the format
    Other(u8),
}

impl CellError {
    /// Map a BIFF error byte (BoolErr, cached formula results).
    pub fn from_biff(code: u8) -> Self {
        match code {
            0x00 => CellError::Null,
            0x07 => CellError::Div0,
            0x0F => CellError::Value,
            0x17 => CellError::Ref,
            0x1D => CellError::Name,
            0x24 => CellError::Num,
            0x2A => CellError::NA,
            0x2B => CellError::GettingData,
            other => CellError::Other(other),
        }
    }

    /// Parse the textual literal used by OOXML (`t="e"` cells).
    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "#NULL!" => CellError::Null,
            "#DIV/0!" => CellError::Div0,
            "#VALUE!" => CellError::Value,
            "#REF!" => CellError::Ref,
            "#NAME?" => CellError::Name,
            "#NUM!" => CellError::Num,
            "#N/A" => CellError::NA,
            "#GETTING_DATA" => CellError::GettingData,
            _ => return None,
        })
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::Null => f.write_str("#NULL!"),
            CellError::Div0 => f.write_str("#DIV/0!"),
            CellError::Value => f.write_str("#VALUE!"),
            CellError::Ref => f.write_str("#REF!"),
            CellError::Name => f.write_str("#NAME?"),
            CellError::Num => f.write_str("#NUM!"),
            CellError::NA => f.write_str("#N/A"),
            CellError::GettingData => f.write_str("#GETTING_DATA"),
            CellError::Other(code) => write!(f, "#ERR{code}"),
        }
    }
}

/// Decoded value of a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Number(f64),
    String(String),
    Error(CellError),
    DateTime(NaiveDateTime),
}

impl CellValue {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "{e}"),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Zero-based inclusive cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            cell_reference(self.first_row, self.first_col),
            cell_reference(self.last_row, self.last_col)
        )
    }
}

/// Convert a zero-based column index to its letters (0 → "A", 26 → "AA").
pub fn column_index_to_name(col: u32) -> String {
    let mut col = col + 1;
    let mut name = Vec::with_capacity(3);
    while col > 0 {
        col -= 1;
        name.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Convert column letters to a zero-based index (case-insensitive).
pub fn column_name_to_index(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for ch in name.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        result = result.checked_mul(26)?.checked_add(ch as u32 - 'A' as u32 + 1)?;
    }
    Some(result - 1)
}

/// Convert row and column to an A1 reference.
pub fn cell_reference(row: u32, col: u32) -> String {
    format!("{}{}", column_index_to_name(col), row + 1)
}

/// Parse an A1 reference (optionally with `$` markers) into zero-based `(row, col)`.
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_name_to_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Parse `A1:C10` (or a single `B2`) into a range.
pub fn parse_range(range: &str) -> Option<CellRange> {
    let (start, end) = match range.split_once(':') {
        Some((start, end)) => (start, end),
        None => (range, range),
    };
    let (first_row, first_col) = parse_cell_reference(start)?;
    let (last_row, last_col) = parse_cell_reference(end)?;
    Some(CellRange {
        first_row,
        first_col,
        last_row,
        last_col,
    })
}

/// Convert a serial date to a timestamp.
///
/// The 1900 system counts from 1899-12-30 so that serial 60 (the phantom
/// 1900-02-29) lands where Excel puts it; serials below 61 are shifted by one
/// day to compensate.
pub fn excel_date_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let (base, serial) = if is_1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1)?, serial)
    } else if serial < 61.0 {
        (NaiveDate::from_ymd_opt(1899, 12, 31)?, serial)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, serial)
    };

    let days = serial.trunc() as i64;
    let millis = (serial.fract() * 86_400_000.0).round() as i64;
    let midnight = base.and_hms_opt(0, 0, 0)?;
    midnight
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))
}
