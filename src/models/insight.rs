//! Modelo de Insights
//!
//! Este módulo contiene el insight generado por el modelo de texto y el
//! documento agregado que se persiste. El documento es el único artefacto
//! durable del pipeline; regenerar el mismo período lo sobreescribe
//! completo (upsert, nunca merge).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::PeriodMetrics;
use super::period::PeriodType;

/// Prioridad del insight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

/// Categorías conocidas de insight - el parser rechaza cualquier otra
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Trend,
    Comparison,
    Alert,
    Efficiency,
    Recommendation,
    Milestone,
}

/// Insight individual generado por el modelo
///
/// `id = "{periodId}-{index}"`, secuencial y determinista dado el orden
/// de la respuesta del modelo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub id: String,
    pub priority: InsightPriority,
    #[serde(rename = "type")]
    pub insight_type: InsightCategory,
    pub title: String,
    pub description: String,
    pub metric_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_change: Option<f64>,
}

/// Metadata de la generación
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationMetadata {
    pub generated_at: DateTime<Utc>,
    /// Identificador del modelo generador
    pub model: String,
    pub duration_ms: i64,
}

/// Documento de insights - aggregate root persistido
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightsDocument {
    /// Clave de almacenamiento: "{periodType}_{periodId}"
    pub id: String,
    pub period_type: PeriodType,
    pub period_id: String,
    pub display_label: String,
    pub period_start: chrono::NaiveDateTime,
    pub period_end: chrono::NaiveDateTime,
    pub metrics: PeriodMetrics,
    pub insights: Vec<Insight>,
    pub metadata: GenerationMetadata,
}
