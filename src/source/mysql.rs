// src/source/mysql.rs

use super::{RowFilter, SortOrder, TableSource};
use crate::config::DatabaseConfig;
use crate::error::SourceError;
use crate::value::{RawRow, Scalar};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

/// [`TableSource`] backed by a shared MySQL connection pool.
#[derive(Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    /// Open the pool and make sure the server answers.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, SourceError> {
        let options = MySqlConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.name)
            .charset("utf8mb4")
            .collation("utf8mb4_unicode_ci");

        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.max_connections)
            .idle_timeout(Some(cfg.idle_timeout()))
            .max_lifetime(Some(cfg.max_lifetime()))
            .acquire_timeout(cfg.acquire_timeout())
            .connect_with(options)
            .await?;

        let source = Self { pool };
        source.ping().await?;
        info!(
            host = %cfg.host,
            port = cfg.port,
            database = %cfg.name,
            max_connections = cfg.max_connections,
            "database connection established"
        );
        Ok(source)
    }

    /// Wait for checked-out connections to return, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TableSource for MySqlSource {
    async fn count(&self, table: &str, filter: &RowFilter) -> Result<u64, SourceError> {
        let sql = count_sql(table, filter);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in filter.params() {
            query = query.bind(param);
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_page(
        &self,
        table: &str,
        filter: &RowFilter,
        order: SortOrder,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<RawRow>, SourceError> {
        let sql = page_sql(table, filter, order);
        let mut query = sqlx::query(&sql);
        for param in filter.params() {
            query = query.bind(param);
        }
        query = query.bind(limit).bind(offset);

        let mut rows = Vec::with_capacity(limit as usize);
        let mut stream = query.fetch(&self.pool);
        while let Some(row) = stream.try_next().await? {
            rows.push(decode_row(&row)?);
        }
        debug!(table, offset, rows = rows.len(), "page fetched");
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), SourceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Backtick-quote an identifier, doubling any embedded backtick.
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn count_sql(table: &str, filter: &RowFilter) -> String {
    format!(
        "SELECT COUNT(*) AS cnt FROM {}{}",
        quote_ident(table),
        filter.where_clause()
    )
}

fn page_sql(table: &str, filter: &RowFilter, order: SortOrder) -> String {
    format!(
        "SELECT * FROM {}{} ORDER BY id {} LIMIT ? OFFSET ?",
        quote_ident(table),
        filter.where_clause(),
        order.as_sql()
    )
}

fn decode_row(row: &MySqlRow) -> Result<RawRow, SourceError> {
    let mut out = RawRow::new();
    for column in row.columns() {
        let value = decode_cell(row, column.ordinal(), column.name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

/// How a MySQL column type is read into a [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Unsigned,
    Float,
    Double,
    Decimal,
    DateTime,
    Date,
    Time,
    Bit,
    Bytes,
    Text,
}

/// Map a sqlx type name to its decoding. `TINYINT(1)` is reported as
/// `BOOLEAN` but holds arbitrary small integers, so it stays an integer.
fn cell_kind(type_name: &str) -> CellKind {
    match type_name {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            CellKind::Int
        }
        t if t.ends_with(" UNSIGNED") => CellKind::Unsigned,
        "FLOAT" => CellKind::Float,
        "DOUBLE" => CellKind::Double,
        // exact decimals keep their text form and coerce later
        "DECIMAL" => CellKind::Decimal,
        "DATETIME" | "TIMESTAMP" => CellKind::DateTime,
        "DATE" => CellKind::Date,
        "TIME" => CellKind::Time,
        "BIT" => CellKind::Bit,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            CellKind::Bytes
        }
        _ => CellKind::Text,
    }
}

/// Decode one cell into its native scalar. `NULL` becomes the empty string.
fn decode_cell(row: &MySqlRow, idx: usize, name: &str) -> Result<Scalar, SourceError> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Scalar::empty());
    }
    let type_name = raw.type_info().name().to_string();

    let value = match cell_kind(&type_name) {
        CellKind::Int => Scalar::Int(row.try_get_unchecked::<i64, _>(idx)?),
        CellKind::Unsigned => {
            let v = row.try_get_unchecked::<u64, _>(idx)?;
            i64::try_from(v).map_or(Scalar::Float(v as f64), Scalar::Int)
        }
        CellKind::Float => Scalar::Float(f64::from(row.try_get::<f32, _>(idx)?)),
        CellKind::Double => Scalar::Float(row.try_get::<f64, _>(idx)?),
        CellKind::Decimal => Scalar::Text(row.try_get_unchecked::<String, _>(idx)?),
        CellKind::DateTime => Scalar::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?),
        CellKind::Date => {
            Scalar::Text(row.try_get::<NaiveDate, _>(idx)?.format("%Y-%m-%d").to_string())
        }
        CellKind::Time => {
            Scalar::Text(row.try_get::<NaiveTime, _>(idx)?.format("%H:%M:%S").to_string())
        }
        CellKind::Bit => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Scalar::Int(bytes.iter().fold(0i64, |acc, b| (acc << 8) | i64::from(*b)))
        }
        CellKind::Bytes => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Scalar::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        CellKind::Text => row
            .try_get_unchecked::<String, _>(idx)
            .map(Scalar::Text)
            .map_err(|_| SourceError::UnsupportedColumn {
                column: name.to_string(),
                type_name: type_name.clone(),
            })?,
    };
    Ok(value)
}
