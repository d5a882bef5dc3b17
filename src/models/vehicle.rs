//! Modelo de Vehicle
//!
//! Este módulo contiene los atributos de presentación del vehículo y
//! los registros de ingresos/gastos acotados a un vehículo y un período.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Atributos de presentación del vehículo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub id: Uuid,
    pub plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}

impl VehicleInfo {
    /// Nombre para mostrar: "{brand} {model} {year}" recortado,
    /// con fallback a la patente cuando queda en blanco.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(brand) = &self.brand {
            parts.push(brand.trim().to_string());
        }
        if let Some(model) = &self.model {
            parts.push(model.trim().to_string());
        }
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        let name = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.trim().is_empty() {
            self.plate.clone()
        } else {
            name
        }
    }
}

/// Entrada de ingreso registrada manualmente (arriendo, venta, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub entry_type: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Entrada de gasto registrada manualmente (combustible, mantención, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Finanzas de un vehículo acotadas a un período
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleFinanceRecord {
    pub vehicle: VehicleInfo,
    pub income: Vec<IncomeEntry>,
    pub expenses: Vec<ExpenseEntry>,
}
