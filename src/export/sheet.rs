// src/export/sheet.rs

use super::columns::{header_label, is_reserved, order_columns, FAULTS, PRETTY_FIXED, RAW_EMPTY};
use super::Mode;
use crate::error::SerializationError;
use crate::value::{NormalizedRow, Scalar};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::collections::HashSet;

pub const SHEET_NAME: &str = "Data";
pub const COLUMN_WIDTH: f64 = 15.0;
pub const EMPTY_PLACEHOLDER: &str = "No records found for selected criteria";

/// Column names of the sheet, before label substitution.
///
/// Raw mode takes the first row's columns (lexical order). Pretty mode puts
/// the fixed columns first, then every numeric column seen in any row in
/// [`order_columns`] order, then `Faults`.
pub fn headers(rows: &[NormalizedRow], mode: Mode) -> Vec<String> {
    match (mode, rows.first()) {
        (Mode::Raw, None) => RAW_EMPTY.iter().map(|s| s.to_string()).collect(),
        (Mode::Pretty, None) => PRETTY_FIXED.iter().map(|s| s.to_string()).collect(),
        (Mode::Raw, Some(first)) => first.keys().cloned().collect(),
        (Mode::Pretty, Some(_)) => {
            let mut seen = HashSet::new();
            let mut dynamic: Vec<&str> = Vec::new();
            for row in rows {
                for name in row.keys() {
                    if !is_reserved(name) && seen.insert(name.as_str()) {
                        dynamic.push(name);
                    }
                }
            }
            PRETTY_FIXED
                .iter()
                .map(|s| s.to_string())
                .chain(order_columns(&dynamic))
                .chain(std::iter::once(FAULTS.to_string()))
                .collect()
        }
    }
}

/// Encode `rows` as a single-sheet xlsx workbook in memory.
pub fn serialize(rows: &[NormalizedRow], mode: Mode) -> Result<Vec<u8>, SerializationError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let headers = headers(rows, mode);
    if rows.is_empty() {
        for (col, name) in headers.iter().enumerate() {
            sheet.write_string(0, col_num(col)?, name)?;
        }
        sheet.write_string(1, 0, EMPTY_PLACEHOLDER)?;
    } else {
        for (col, name) in headers.iter().enumerate() {
            sheet.write_string(0, col_num(col)?, header_label(name))?;
        }
        for (idx, row) in rows.iter().enumerate() {
            let r = row_num(idx + 1)?;
            for (col, name) in headers.iter().enumerate() {
                if let Some(value) = row.get(name) {
                    write_cell(sheet, r, col_num(col)?, value)?;
                }
            }
        }
    }

    for col in 0..headers.len() {
        sheet.set_column_width(col_num(col)?, COLUMN_WIDTH)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Scalar) -> Result<(), XlsxError> {
    match value {
        Scalar::Null => {}
        Scalar::Text(s) if s.is_empty() => {}
        Scalar::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        Scalar::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Scalar::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f)?;
        }
        Scalar::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Scalar::Float(_) | Scalar::Timestamp(_) => {
            sheet.write_string(row, col, value.to_string())?;
        }
    }
    Ok(())
}

fn row_num(idx: usize) -> Result<u32, XlsxError> {
    u32::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn col_num(idx: usize) -> Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}
