// src/export/reader.rs

use crate::error::{RetrievalError, ValidationError};
use crate::source::{RowFilter, SortOrder, TableSource};
use crate::value::RawRow;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Log progress every this many chunks.
const PROGRESS_EVERY: u64 = 5;

/// Calendar-day window: `from` inclusive, `to` inclusive as a whole day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Parse `YYYY-MM-DD` bounds. Missing or empty strings leave the bound open.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            from: parse_date("fromDate", from)?,
            to: parse_date("toDate", to)?,
        })
    }

    /// `created_at >= from 00:00:00` and `created_at < (to + 1 day) 00:00:00`.
    pub fn to_filter(&self) -> RowFilter {
        RowFilter {
            created_from: self.from.and_then(|d| d.and_hms_opt(0, 0, 0)),
            created_before: self
                .to
                .and_then(|d| d.succ_opt())
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate {
                field,
                value: s.to_string(),
            }),
    }
}

/// Pages through a table `chunk_size` rows at a time.
#[derive(Clone)]
pub struct ChunkedReader {
    source: Arc<dyn TableSource>,
    chunk_size: u64,
}

impl ChunkedReader {
    pub fn new(source: Arc<dyn TableSource>, chunk_size: u64) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Count the matching rows, then hand each page to `on_chunk` in offset
    /// order. Any failed query aborts the whole read. Returns the number of
    /// rows delivered.
    pub async fn for_each_chunk<F>(
        &self,
        table: &str,
        range: &DateRange,
        order: SortOrder,
        mut on_chunk: F,
    ) -> Result<u64, RetrievalError>
    where
        F: FnMut(Vec<RawRow>),
    {
        let filter = range.to_filter();
        let total = self
            .source
            .count(table, &filter)
            .await
            .map_err(|source| RetrievalError::CountFailed {
                table: table.to_string(),
                source,
            })?;
        info!(table, total, "matching records");

        let mut offset = 0u64;
        let mut delivered = 0u64;
        let mut chunk_idx = 0u64;
        while offset < total {
            let limit = self.chunk_size.min(total - offset);
            let rows = self
                .source
                .fetch_page(table, &filter, order, limit, offset)
                .await
                .map_err(|source| RetrievalError::ChunkFailed {
                    table: table.to_string(),
                    offset,
                    source,
                })?;

            debug!(table, chunk = chunk_idx, offset, rows = rows.len(), "chunk read");
            delivered += rows.len() as u64;
            on_chunk(rows);

            offset += limit;
            chunk_idx += 1;
            if chunk_idx % PROGRESS_EVERY == 0 {
                info!(table, processed = offset, total, "export progress");
            }
        }
        Ok(delivered)
    }

    /// All matching rows, concatenated in fetch order.
    pub async fn export(
        &self,
        table: &str,
        range: &DateRange,
        order: SortOrder,
    ) -> Result<Vec<RawRow>, RetrievalError> {
        let mut all = Vec::new();
        self.for_each_chunk(table, range, order, |chunk| all.extend(chunk))
            .await?;
        Ok(all)
    }
}
