use crate::batch::{summarize, BatchOrchestrator};
use crate::config::Config;
use crate::enrichment::EnrichmentContext;
use crate::errors::AppError;
use crate::export::{from_csv, to_csv};
use crate::models::*;
use crate::normalize::clean_opt;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Discovery, enrichment and scoring over the configured sources.
    pub pipeline: Arc<BatchOrchestrator>,
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
///
/// Returns the service status, version and which optional sources are configured.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-hunter",
            "version": env!("CARGO_PKG_VERSION"),
            "paid_search": state.config.has_serpapi_key(),
        })),
    )
}

fn required(value: Option<&str>, field: &str) -> Result<String, AppError> {
    clean_opt(value).ok_or_else(|| AppError::BadRequest(format!("Missing '{}'", field)))
}

/// POST /api/v1/discover
///
/// Runs the discovery fallback chain only. An empty result is not an error:
/// the response carries no leads and a notice suggesting a broader query.
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiscoverRequest>,
) -> Result<Json<DiscoverResponse>, AppError> {
    let role = required(Some(req.role.as_str()), "role")?;
    let location = required(Some(req.location.as_str()), "location")?;
    tracing::info!("POST /discover - role: '{}', location: '{}'", role, location);

    let outcome = state.pipeline.discover(&role, &location).await;
    let notice = outcome.notice(&role);

    Ok(Json(DiscoverResponse {
        used_fallback: outcome.used_fallback,
        strategy: outcome.strategy,
        notice,
        leads: outcome.leads,
    }))
}

/// POST /api/v1/leads/process
///
/// With `leads` in the body the records are processed as uploaded. Otherwise
/// `role` and `location` seed discovery first. Returns the ranked table.
pub async fn process_leads(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let run_id = Uuid::new_v4();
    let context = EnrichmentContext::for_role(req.role.as_deref());

    let (records, used_fallback, notice) = match req.leads {
        Some(leads) => {
            let records: Vec<LeadRecord> = leads
                .into_iter()
                .map(LeadRecord::from)
                .filter(|r| !r.name.is_empty())
                .collect();
            if records.is_empty() {
                return Err(AppError::BadRequest("No named leads supplied".to_string()));
            }
            let notice = format!("Processing {} uploaded leads.", records.len());
            (records, false, notice)
        }
        None => {
            let role = required(req.role.as_deref(), "role")?;
            let location = required(req.location.as_deref(), "location")?;

            let outcome = state.pipeline.discover(&role, &location).await;
            if outcome.is_empty() {
                return Err(AppError::NotFound(outcome.notice(&role)));
            }
            let notice = outcome.notice(&role);
            (outcome.leads, outcome.used_fallback, notice)
        }
    };

    tracing::info!("[{}] Processing {} leads", run_id, records.len());
    let leads = state
        .pipeline
        .run(records, &context, |done, total, record| {
            tracing::debug!(
                "[{}] {}/{} done: {} scored {:?}",
                run_id,
                done,
                total,
                record.name,
                record.score
            );
        })
        .await;

    let summary = summarize(&leads);
    tracing::info!(
        "[{}] Batch complete: {} leads, {} hot, {} researchers",
        run_id,
        summary.total,
        summary.hot_leads,
        summary.researchers
    );

    Ok(Json(ProcessResponse {
        run_id,
        used_fallback,
        notice,
        summary,
        leads,
    }))
}

fn csv_response(body: String) -> Response {
    let filename = format!(
        "attachment; filename=\"leads_{}.csv\"",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    )
        .into_response()
}

/// POST /api/v1/leads/upload?role=..
///
/// Accepts a CSV lead list (Name, Company, optional Title and Location),
/// enriches and scores it, and returns the ranked table as CSV.
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: String,
) -> Result<Response, AppError> {
    let records = from_csv(&body)?;
    if records.is_empty() {
        return Err(AppError::BadRequest("CSV contains no named leads".to_string()));
    }
    tracing::info!("POST /leads/upload - {} leads", records.len());

    let context = EnrichmentContext::for_role(params.role.as_deref());
    let leads = state.pipeline.run(records, &context, |_, _, _| {}).await;

    Ok(csv_response(to_csv(&leads)?))
}

/// POST /api/v1/leads/export
///
/// Serializes already-processed records to CSV with the fixed column set.
pub async fn export_csv(Json(records): Json<Vec<LeadRecord>>) -> Result<Response, AppError> {
    tracing::info!("POST /leads/export - {} rows", records.len());
    Ok(csv_response(to_csv(&records)?))
}
