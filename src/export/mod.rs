// src/export/mod.rs

use crate::error::{ExportError, Result, SerializationError, ValidationError};
use crate::registry;
use crate::source::{SortOrder, TableSource};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub mod columns;
pub mod normalize;
pub mod reader;
pub mod sheet;

pub use normalize::{extract_faults, normalize, normalize_timestamp, TimestampParts};
pub use reader::{ChunkedReader, DateRange};

/// Output shape of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Source columns as-is, `created_at` canonicalized.
    Raw,
    /// Split timestamp, ordered numeric columns and a fault summary.
    Pretty,
}

impl Mode {
    /// The `all` query parameter: absent or `"true"` selects raw mode, any
    /// other value selects pretty mode.
    pub fn from_all_param(all: Option<&str>) -> Self {
        match all.filter(|s| !s.is_empty()).unwrap_or("true") {
            "true" => Mode::Raw,
            _ => Mode::Pretty,
        }
    }
}

/// Query parameters of `GET /export`, exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub table: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub all: Option<String>,
    pub order: Option<String>,
}

/// A validated export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub table: String,
    pub range: DateRange,
    pub order: SortOrder,
    pub mode: Mode,
}

impl ExportRequest {
    pub fn from_params(params: &ExportParams) -> std::result::Result<Self, ValidationError> {
        let table = match params.table.as_deref() {
            None | Some("") => return Err(ValidationError::MissingTable),
            Some(t) if !registry::is_allowed(t) => {
                return Err(ValidationError::UnknownTable(t.to_string()))
            }
            Some(t) => t.to_string(),
        };
        Ok(Self {
            table,
            range: DateRange::parse(params.from_date.as_deref(), params.to_date.as_deref())?,
            order: SortOrder::from_param(params.order.as_deref()),
            mode: Mode::from_all_param(params.all.as_deref()),
        })
    }
}

/// A finished spreadsheet.
#[derive(Debug)]
pub struct ExportFile {
    pub file_name: String,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

/// `<table>_<YYYY-MM-DD>_<n>records.xlsx`
pub fn file_name(table: &str, day: NaiveDate, row_count: usize) -> String {
    format!(
        "{}_{}_{}records.xlsx",
        table,
        day.format("%Y-%m-%d"),
        row_count
    )
}

/// Runs count → pages → normalize → serialize for one request.
#[derive(Clone)]
pub struct Exporter {
    reader: ChunkedReader,
}

impl Exporter {
    pub fn new(source: Arc<dyn TableSource>, chunk_size: u64) -> Self {
        Self {
            reader: ChunkedReader::new(source, chunk_size),
        }
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(table = %req.table, mode = ?req.mode, order = ?req.order)
    )]
    pub async fn export(&self, req: &ExportRequest) -> Result<ExportFile> {
        if !registry::is_allowed(&req.table) {
            return Err(ValidationError::UnknownTable(req.table.clone()).into());
        }
        let start = Instant::now();
        let mode = req.mode;

        // each page is normalized as it arrives so raw pages never pile up
        let mut rows = Vec::new();
        self.reader
            .for_each_chunk(&req.table, &req.range, req.order, |chunk| {
                rows.extend(chunk.into_iter().map(|row| normalize(row, mode)))
            })
            .await?;
        let row_count = rows.len();

        let bytes = tokio::task::spawn_blocking(move || sheet::serialize(&rows, mode))
            .await
            .map_err(|e| ExportError::from(SerializationError::Task(e.to_string())))??;

        info!(
            rows = row_count,
            bytes = bytes.len(),
            elapsed = ?start.elapsed(),
            "export complete"
        );
        Ok(ExportFile {
            file_name: file_name(&req.table, Local::now().date_naive(), row_count),
            row_count,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalError;
    use crate::source::memory::MemorySource;
    use crate::value::{RawRow, Scalar};
    use std::io::{Cursor, Read};

    const TABLE: &str = "GTPL_108_gT_40E_P_S7_200_Germany";

    fn params(pairs: &[(&str, &str)]) -> ExportParams {
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        };
        ExportParams {
            table: get("table"),
            from_date: get("fromDate"),
            to_date: get("toDate"),
            all: get("all"),
            order: get("order"),
        }
    }

    fn reading(id: i64, ts: &str, pairs: &[(&str, Scalar)]) -> RawRow {
        let mut row: RawRow = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        row.insert("id".into(), Scalar::Int(id));
        row.insert("created_at".into(), Scalar::from(ts));
        row
    }

    fn sheet_xml(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_mode_from_all_param() {
        assert_eq!(Mode::from_all_param(None), Mode::Raw);
        assert_eq!(Mode::from_all_param(Some("")), Mode::Raw);
        assert_eq!(Mode::from_all_param(Some("true")), Mode::Raw);
        assert_eq!(Mode::from_all_param(Some("false")), Mode::Pretty);
        assert_eq!(Mode::from_all_param(Some("TRUE")), Mode::Pretty);
    }

    #[test]
    fn test_request_from_params() {
        let req = ExportRequest::from_params(&params(&[
            ("table", TABLE),
            ("fromDate", "2024-01-01"),
            ("toDate", "2024-01-02"),
            ("all", "false"),
            ("order", "ASC"),
        ]))
        .unwrap();
        assert_eq!(req.table, TABLE);
        assert_eq!(req.mode, Mode::Pretty);
        assert_eq!(req.order, SortOrder::Asc);
        assert_eq!(req.range.from, NaiveDate::from_ymd_opt(2024, 1, 1));

        let defaults = ExportRequest::from_params(&params(&[("table", TABLE)])).unwrap();
        assert_eq!(defaults.mode, Mode::Raw);
        assert_eq!(defaults.order, SortOrder::Desc);
        assert_eq!(defaults.range, DateRange::default());
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(
            ExportRequest::from_params(&params(&[])).unwrap_err(),
            ValidationError::MissingTable
        );
        assert_eq!(
            ExportRequest::from_params(&params(&[("table", "")])).unwrap_err(),
            ValidationError::MissingTable
        );
        assert_eq!(
            ExportRequest::from_params(&params(&[("table", "drop_table")])).unwrap_err(),
            ValidationError::UnknownTable("drop_table".into())
        );
        assert!(matches!(
            ExportRequest::from_params(&params(&[("table", TABLE), ("toDate", "yesterday")])),
            Err(ValidationError::InvalidDate { field: "toDate", .. })
        ));
    }

    #[test]
    fn test_file_name() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            file_name(TABLE, day, 42),
            "GTPL_108_gT_40E_P_S7_200_Germany_2024-03-09_42records.xlsx"
        );
    }

    #[tokio::test]
    async fn test_unknown_table_issues_no_queries() {
        let source = Arc::new(MemorySource::new());
        let exporter = Exporter::new(source.clone(), 10);
        let req = ExportRequest {
            table: "drop_table".into(),
            range: DateRange::default(),
            order: SortOrder::Desc,
            mode: Mode::Raw,
        };
        let err = exporter.export(&req).await.unwrap_err();
        assert!(matches!(err, ExportError::Validation(_)));
        assert!(err.is_client_error());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pretty_export_scenario() {
        let rows = vec![
            reading(
                1,
                "2024-01-01 08:00:00",
                &[
                    ("Fault_code", Scalar::Int(1)),
                    ("T2_1_ambient_temp", Scalar::from("22.5")),
                ],
            ),
            reading(
                2,
                "2024-01-02 09:00:00",
                &[("Fault_code", Scalar::Int(0)), ("T2_1_ambient_temp", Scalar::from("21"))],
            ),
            reading(
                3,
                "2024-01-02 23:59:59",
                &[("Fault_code", Scalar::Int(0)), ("HP_value", Scalar::Float(14.2))],
            ),
            // outside the requested range
            reading(4, "2024-01-03 00:00:00", &[("Fault_code", Scalar::Int(1))]),
        ];
        let source = Arc::new(MemorySource::new().with_table(TABLE, rows));
        let exporter = Exporter::new(source.clone(), 2);
        let req = ExportRequest::from_params(&params(&[
            ("table", TABLE),
            ("fromDate", "2024-01-01"),
            ("toDate", "2024-01-02"),
            ("all", "false"),
            ("order", "asc"),
        ]))
        .unwrap();

        let file = exporter.export(&req).await.unwrap();
        assert_eq!(file.row_count, 3);
        assert!(file.file_name.starts_with(TABLE));
        assert!(file.file_name.ends_with("_3records.xlsx"));
        assert_eq!(source.page_calls(), vec![(2, 0), (1, 2)]);

        let strings = sheet_xml(&file.bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("Fault code"));
        // header: id, created_at, date, time, T2_1 (E), HP_value (F), Fault_code (G), Faults (H)
        let sheet = sheet_xml(&file.bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="E2"><v>22.5</v></c>"#));
        assert!(sheet.contains(r#"<c r="F4"><v>14.2</v></c>"#));
        assert!(!sheet.contains(r#"r="F2""#));
        assert!(sheet.contains(r#"<c r="G2"><v>1</v></c>"#));
    }

    #[tokio::test]
    async fn test_empty_range_yields_placeholder() {
        let source = Arc::new(MemorySource::new().with_table(TABLE, Vec::new()));
        let exporter = Exporter::new(source.clone(), 10);
        let req = ExportRequest::from_params(&params(&[("table", TABLE), ("all", "false")]))
            .unwrap();
        let file = exporter.export(&req).await.unwrap();
        assert_eq!(file.row_count, 0);
        assert!(file.file_name.ends_with("_0records.xlsx"));
        assert!(source.page_calls().is_empty());
        let strings = sheet_xml(&file.bytes, "xl/sharedStrings.xml");
        assert!(strings.contains(sheet::EMPTY_PLACEHOLDER));
        assert!(strings.contains("created_at_time"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_reported() {
        let source = Arc::new(
            MemorySource::new()
                .with_table(TABLE, vec![reading(1, "2024-01-01 00:00:00", &[])])
                .failing_page_at(0),
        );
        let exporter = Exporter::new(source, 10);
        let req = ExportRequest::from_params(&params(&[("table", TABLE)])).unwrap();
        let err = exporter.export(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ExportError::Retrieval(RetrievalError::ChunkFailed { offset: 0, .. })
        ));
        assert_eq!(err.public_message(), "Failed to process data");
        assert!(!err.is_client_error());
    }
}
