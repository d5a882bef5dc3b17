//! Modelo de Período
//!
//! Este módulo contiene los tipos de período soportados y el rango
//! calculado para cada uno. Los rangos siempre quedan anclados a
//! 00:00:00.000 / 23:59:59.999 en hora de calendario local.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Granularidad de período - enum cerrado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl PeriodType {
    /// Parsear el token usado en storage keys y rutas HTTP
    pub fn parse(value: &str) -> Option<PeriodType> {
        match value {
            "daily" => Some(PeriodType::Daily),
            "weekly" => Some(PeriodType::Weekly),
            "biweekly" => Some(PeriodType::Biweekly),
            "monthly" => Some(PeriodType::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Biweekly => "biweekly",
            PeriodType::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rango de período calculado
///
/// Invariante: `start <= end` y `id` es una codificación biyectiva de
/// (period_type, start) - format/parse hacen round-trip exacto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodRange {
    pub period_type: PeriodType,
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub display_label: String,
}

impl PeriodRange {
    /// Clave de almacenamiento del documento de insights: "{type}_{id}"
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.period_type, self.id)
    }
}
