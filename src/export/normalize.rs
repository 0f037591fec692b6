// src/export/normalize.rs

use super::columns::{
    is_reserved, looks_like_fault_key, CREATED_AT, CREATED_AT_DATE, CREATED_AT_TIME, FAULTS, ID,
};
use super::Mode;
use crate::value::{NormalizedRow, RawRow, Scalar, TIMESTAMP_FORMAT};

/// Length of `YYYY-MM-DD HH:MM:SS`.
const TIMESTAMP_LEN: usize = 19;

/// Canonical timestamp plus its date and time halves. All empty when the
/// input is missing or not a timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampParts {
    pub full: String,
    pub date: String,
    pub time: String,
}

pub fn normalize_timestamp(value: Option<&Scalar>) -> TimestampParts {
    let full = match value {
        Some(Scalar::Timestamp(ts)) => ts.format(TIMESTAMP_FORMAT).to_string(),
        Some(Scalar::Text(s)) => {
            let s = s.replacen('T', " ", 1);
            match s.char_indices().nth(TIMESTAMP_LEN) {
                Some((cut, _)) => s[..cut].to_string(),
                None => s,
            }
        }
        _ => return TimestampParts::default(),
    };

    let (date, time) = match full.split_once(' ') {
        Some((d, t)) => (d.to_string(), t.to_string()),
        None => (full.clone(), String::new()),
    };
    TimestampParts { full, date, time }
}

/// Human-readable names of every fault column holding a true-ish value,
/// joined with `", "` in column-name order.
pub fn extract_faults(row: &RawRow) -> String {
    row.iter()
        .filter(|(name, value)| looks_like_fault_key(name) && value.is_trueish())
        .map(|(name, _)| name.replace('_', " "))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn normalize(row: RawRow, mode: Mode) -> NormalizedRow {
    match mode {
        Mode::Raw => normalize_raw(row),
        Mode::Pretty => normalize_pretty(&row),
    }
}

fn normalize_raw(mut row: RawRow) -> NormalizedRow {
    let ts = normalize_timestamp(row.get(CREATED_AT));
    row.insert(CREATED_AT.to_string(), Scalar::Text(ts.full));
    row
}

/// Identity, split timestamp, numeric columns and the fault summary. Columns
/// that do not coerce to a number are left out; the sheet writer fills the
/// gaps with empty cells.
fn normalize_pretty(row: &RawRow) -> NormalizedRow {
    let ts = normalize_timestamp(row.get(CREATED_AT));
    let mut out = NormalizedRow::new();
    out.insert(
        ID.to_string(),
        row.get(ID).cloned().unwrap_or_else(Scalar::empty),
    );
    out.insert(CREATED_AT.to_string(), Scalar::Text(ts.full));
    out.insert(CREATED_AT_DATE.to_string(), Scalar::Text(ts.date));
    out.insert(CREATED_AT_TIME.to_string(), Scalar::Text(ts.time));

    for (name, value) in row {
        if is_reserved(name) {
            continue;
        }
        if let Some(n) = value.to_number() {
            out.insert(name.clone(), n.into());
        }
    }

    out.insert(FAULTS.to_string(), Scalar::Text(extract_faults(row)));
    out
}
