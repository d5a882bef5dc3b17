//! Rutas de la API de insights
//!
//! El trigger del pipeline y las rutas de lectura. Los repositorios y
//! el cliente del modelo se construyen por request desde el estado
//! compartido - la credencial ausente se reporta como error de
//! configuración antes de tocar ninguna etapa del pipeline.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::dto::insights_dto::{GenerateInsightsRequest, RecentQuery};
use crate::models::insight::InsightsDocument;
use crate::models::period::PeriodType;
use crate::repositories::insights_repository::InsightsRepository;
use crate::repositories::notification_repository::NotificationRepository;
use crate::repositories::ride_repository::RideRepository;
use crate::services::insight_service::{GeminiClient, InsightService};
use crate::services::period_calculator::{
    get_period_range_from_id, get_previous_period, parse_period_id,
};
use crate::services::report_pipeline::{
    InsightsStore, PipelineFlags, PipelineResult, ReportPipeline,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_insights_router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_insights))
        .route("/recent", get(recent_documents))
        .route("/:period_type/:period_id", get(get_document))
}

fn parse_period_type(value: &str) -> Result<PeriodType, AppError> {
    PeriodType::parse(value).ok_or_else(|| {
        AppError::Validation(format!(
            "'{}' is not a valid period type (daily|weekly|biweekly|monthly)",
            value
        ))
    })
}

/// Disparar el pipeline para un período elegido por el operador o,
/// sin `period_id`, para el período anterior a la fecha de referencia
/// (el contrato que usa el scheduler)
async fn generate_insights(
    State(state): State<AppState>,
    Json(request): Json<GenerateInsightsRequest>,
) -> Result<Json<PipelineResult>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let period_type = parse_period_type(&request.period_type)?;

    let period = match &request.period_id {
        Some(id) => get_period_range_from_id(id, period_type).ok_or_else(|| {
            AppError::NotFound(format!(
                "'{}' is not a valid {} period id",
                id, period_type
            ))
        })?,
        None => {
            let reference = request
                .reference_date
                .unwrap_or_else(|| Utc::now().date_naive());
            get_previous_period(period_type, reference)
        }
    };

    let include_vehicle_finance = request
        .include_vehicle_finance
        .unwrap_or(period_type != PeriodType::Daily);

    let generator = Arc::new(GeminiClient::from_config(&state.config)?);
    let insight_service =
        InsightService::new(generator, state.config.gemini_max_output_tokens);

    let pipeline = ReportPipeline::new(
        Arc::new(RideRepository::new(state.pool.clone())),
        Arc::new(InsightsRepository::new(state.pool.clone())),
        Arc::new(NotificationRepository::new(
            state.pool.clone(),
            state.config.notification_role.clone(),
        )),
        insight_service,
        Duration::from_secs(state.config.generation_timeout_secs),
    );

    let result = pipeline
        .run(&period, PipelineFlags { include_vehicle_finance })
        .await?;

    Ok(Json(result))
}

/// Obtener un documento por (tipo, id de período)
async fn get_document(
    State(state): State<AppState>,
    Path((period_type, period_id)): Path<(String, String)>,
) -> Result<Json<InsightsDocument>, AppError> {
    let period_type = parse_period_type(&period_type)?;

    // un id malformado es un "not found" normal, no una falla interna
    if parse_period_id(&period_id, period_type).is_none() {
        return Err(AppError::NotFound(format!(
            "'{}' is not a valid {} period id",
            period_id, period_type
        )));
    }

    let repository = InsightsRepository::new(state.pool.clone());
    let key = format!("{}_{}", period_type, period_id);
    let document = repository
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report '{}' not found", key)))?;

    Ok(Json(document))
}

/// Listado de documentos por recencia de generación
async fn recent_documents(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<InsightsDocument>>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let repository = InsightsRepository::new(state.pool.clone());
    let documents = repository.recent(query.limit.unwrap_or(10)).await?;
    Ok(Json(documents))
}
