// src/server.rs

use crate::error::ExportError;
use crate::export::{ExportParams, ExportRequest, Exporter};
use crate::registry;
use crate::source::TableSource;
use chrono::Local;
use serde::Serialize;
use std::{convert::Infallible, sync::Arc, time::Instant};
use tracing::{error, info, warn};
use warp::http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CACHE_CONTROL,
    CONTENT_DISPOSITION, CONTENT_TYPE,
};
use warp::http::{Method, StatusCode};
use warp::reply::Response;
use warp::{reject::Rejection, reply::Reply, Filter};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Shared by every request.
pub struct AppState {
    pub exporter: Exporter,
    pub source: Arc<dyn TableSource>,
    pub started: Instant,
}

impl AppState {
    pub fn new(source: Arc<dyn TableSource>, chunk_size: u64) -> Self {
        Self {
            exporter: Exporter::new(source.clone(), chunk_size),
            source,
            started: Instant::now(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    headers
}

/// All endpoints, with CORS headers on every response.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let export = warp::path("export")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ExportParams>())
        .and(with_state(state.clone()))
        .and_then(handle_export);

    let tables = warp::path("tables")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handle_tables);

    let status = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_status);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and_then(health_check);

    // preflight requests are answered on any path; other methods fall
    // through as not-found rather than method-not-allowed
    let preflight = warp::method().and_then(|method: Method| async move {
        if method == Method::OPTIONS {
            Ok(StatusCode::OK)
        } else {
            Err(warp::reject::not_found())
        }
    });

    export
        .or(tables)
        .or(status)
        .or(health)
        .or(preflight)
        .recover(handle_rejection)
        .with(warp::reply::with::headers(cors_headers()))
}

async fn handle_export(
    params: ExportParams,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let req = match ExportRequest::from_params(&params) {
        Ok(req) => req,
        Err(e) => {
            warn!(table = ?params.table, "rejected export request: {}", e);
            return Ok(error_reply(&ExportError::from(e)));
        }
    };

    info!(
        table = %req.table,
        from = ?req.range.from,
        to = ?req.range.to,
        mode = ?req.mode,
        order = ?req.order,
        "export requested"
    );

    match state.exporter.export(&req).await {
        Ok(file) => {
            let disposition = format!("attachment; filename=\"{}\"", file.file_name);
            let reply = warp::reply::with_status(file.bytes, StatusCode::OK);
            let reply = warp::reply::with_header(reply, CONTENT_TYPE, XLSX_CONTENT_TYPE);
            let reply = warp::reply::with_header(reply, CONTENT_DISPOSITION, disposition);
            let reply =
                warp::reply::with_header(reply, ACCESS_CONTROL_EXPOSE_HEADERS, "Content-Disposition");
            Ok(reply.into_response())
        }
        Err(e) => {
            let reply = error_reply(&e);
            error!(table = %req.table, "export failed: {:#}", anyhow::Error::from(e));
            Ok(reply)
        }
    }
}

fn error_reply(err: &ExportError) -> Response {
    let (status, details) = if err.is_client_error() {
        (StatusCode::BAD_REQUEST, Some(err.to_string()))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, None)
    };
    let body = ErrorResponse {
        error: err.public_message().to_string(),
        details,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_tables() -> Result<impl Reply, Rejection> {
    let tables = registry::allowed_tables();
    Ok(warp::reply::json(&serde_json::json!({
        "tables": tables,
        "count": tables.len(),
        "timestamp": Local::now().to_rfc3339(),
    })))
}

async fn handle_status(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let database = match state.source.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };
    Ok(warp::reply::json(&serde_json::json!({
        "status": "running",
        "database": database,
        "uptime": format!("{:?}", state.started.elapsed()),
        "timestamp": Local::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

async fn health_check(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let reply = match state.source.ping().await {
        Ok(()) => warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": Local::now().to_rfc3339(),
            })),
            StatusCode::OK,
        ),
        Err(e) => {
            warn!("health check failed: {}", e);
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "error": e.to_string(),
                })),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    };
    Ok(reply)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid request parameters")
    } else {
        warn!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };
    let body = ErrorResponse {
        error: message.to_string(),
        details: None,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
