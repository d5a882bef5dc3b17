//! DTOs de la API de insights

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

/// Request del trigger de generación
///
/// El scheduler y el operador usan el mismo contrato: si viene
/// `period_id` se regenera ese período exacto; si no, se genera el
/// período anterior al de `reference_date` (hoy por defecto).
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateInsightsRequest {
    pub period_type: String,

    pub period_id: Option<String>,

    pub reference_date: Option<NaiveDate>,

    /// Por defecto se omite solo en períodos diarios
    pub include_vehicle_finance: Option<bool>,
}

/// Query del listado por recencia
#[derive(Debug, Deserialize, Validate)]
pub struct RecentQuery {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}
