// src/source/memory.rs

use super::{RowFilter, SortOrder, TableSource};
use crate::error::SourceError;
use crate::value::{RawRow, Scalar};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Count { table: String },
    Page { limit: u64, offset: u64, order: SortOrder },
}

/// In-memory tables that record every query issued against them.
#[derive(Default)]
pub struct MemorySource {
    tables: BTreeMap<String, Vec<RawRow>>,
    calls: Mutex<Vec<Call>>,
    fail_count: bool,
    fail_page_at: Option<u64>,
    healthy: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: &str, rows: Vec<RawRow>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    pub fn failing_page_at(mut self, offset: u64) -> Self {
        self.fail_page_at = Some(offset);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn page_calls(&self) -> Vec<(u64, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Page { limit, offset, .. } => Some((limit, offset)),
                _ => None,
            })
            .collect()
    }

    fn matching(&self, table: &str, filter: &RowFilter) -> Vec<RawRow> {
        self.tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| created_at(r).map_or(true, |ts| filter.matches(ts)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn created_at(row: &RawRow) -> Option<NaiveDateTime> {
    match row.get("created_at")? {
        Scalar::Timestamp(ts) => Some(*ts),
        Scalar::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok(),
        _ => None,
    }
}

fn id_of(row: &RawRow) -> i64 {
    match row.get("id") {
        Some(Scalar::Int(i)) => *i,
        _ => 0,
    }
}

#[async_trait]
impl TableSource for MemorySource {
    async fn count(&self, table: &str, filter: &RowFilter) -> Result<u64, SourceError> {
        self.calls.lock().unwrap().push(Call::Count {
            table: table.to_string(),
        });
        if self.fail_count {
            return Err(SourceError::Other("count refused".into()));
        }
        Ok(self.matching(table, filter).len() as u64)
    }

    async fn fetch_page(
        &self,
        table: &str,
        filter: &RowFilter,
        order: SortOrder,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<RawRow>, SourceError> {
        self.calls.lock().unwrap().push(Call::Page {
            limit,
            offset,
            order,
        });
        if self.fail_page_at == Some(offset) {
            return Err(SourceError::Other("connection reset".into()));
        }
        let mut rows = self.matching(table, filter);
        rows.sort_by_key(id_of);
        if order == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), SourceError> {
        if self.healthy {
            Ok(())
        } else {
            Err(SourceError::Other("database unreachable".into()))
        }
    }
}
