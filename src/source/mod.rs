// src/source/mod.rs

use crate::error::SourceError;
use crate::value::RawRow;
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[cfg(test)]
pub(crate) mod memory;
pub mod mysql;

pub use mysql::MySqlSource;

/// Direction of the `id` ordering. Only these two keywords ever reach SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` in any case is ascending; everything else, including an absent
    /// parameter, is descending.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(p) if p.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Half-open `created_at` window. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Inclusive lower bound.
    pub created_from: Option<NaiveDateTime>,
    /// Exclusive upper bound.
    pub created_before: Option<NaiveDateTime>,
}

impl RowFilter {
    /// `WHERE` fragment with one `?` placeholder per bound, or an empty string.
    pub fn where_clause(&self) -> String {
        let mut conditions = Vec::with_capacity(2);
        if self.created_from.is_some() {
            conditions.push("created_at >= ?");
        }
        if self.created_before.is_some() {
            conditions.push("created_at < ?");
        }
        if conditions.is_empty() {
            return String::new();
        }
        format!(" WHERE {}", conditions.join(" AND "))
    }

    /// Bind values, in the same order as the placeholders of [`Self::where_clause`].
    pub fn params(&self) -> Vec<NaiveDateTime> {
        self.created_from
            .into_iter()
            .chain(self.created_before)
            .collect()
    }

    pub fn matches(&self, created_at: NaiveDateTime) -> bool {
        self.created_from.map_or(true, |from| created_at >= from)
            && self.created_before.map_or(true, |to| created_at < to)
    }
}

/// A queryable table store. Implementations must return rows of one page in
/// `id` order and decode SQL `NULL` as the empty string.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Number of rows in `table` matching `filter`.
    async fn count(&self, table: &str, filter: &RowFilter) -> Result<u64, SourceError>;

    /// At most `limit` rows starting at `offset`, ordered by `id`.
    async fn fetch_page(
        &self,
        table: &str,
        filter: &RowFilter,
        order: SortOrder,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<RawRow>, SourceError>;

    /// Cheap liveness probe used by the health endpoints.
    async fn ping(&self) -> Result<(), SourceError>;
}
