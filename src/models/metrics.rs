//! Modelos de métricas derivadas
//!
//! Este módulo contiene las métricas calculadas por el agregador.
//! Son inmutables y se recalculan completas en cada invocación -
//! no hay estado incremental ni cacheado.
//!
//! Convención de redondeo (se preserva en todo el sistema):
//! - montos de dinero nunca se redondean
//! - tasas y ratios se redondean a 1 decimal
//! - revenue/costo por km se redondea al entero más cercano

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Desglose por origen del viaje
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceBreakdown {
    pub count: i64,
    pub revenue: f64,
    /// Porcentaje sobre el total de viajes completados (0 si no hay)
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RidesBySource {
    pub platform: SourceBreakdown,
    pub external: SourceBreakdown,
}

/// Métricas de viajes del período
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RidesMetrics {
    pub total: i64,
    pub completed: i64,
    pub total_revenue: f64,
    pub average_per_ride: f64,
    pub by_source: RidesBySource,
    /// Variación porcentual de completados vs período anterior.
    /// None cuando el período anterior no tiene completados.
    pub change_vs_previous: Option<f64>,
}

/// Cancelaciones por responsable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationsByReason {
    pub by_passenger: i64,
    pub by_driver: i64,
    pub other: i64,
}

/// Métricas de cancelaciones del período
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationsMetrics {
    pub total: i64,
    /// cancelados / (completados + cancelados) * 100, 1 decimal
    pub rate: f64,
    pub by_reason: CancellationsByReason,
    /// Delta absoluto en puntos porcentuales vs período anterior.
    /// None cuando el período anterior no tiene viajes terminados.
    pub change_vs_previous: Option<f64>,
}

/// Métricas de distancia del período
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KilometersMetrics {
    pub total_km: f64,
    pub average_per_ride: f64,
    /// Redondeado al entero más cercano, 0 si no hay kilómetros
    pub revenue_per_km: f64,
}

/// Categoría de gasto con su monto acumulado
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseCategorySummary {
    pub category: String,
    pub amount: f64,
}

/// P/L de un vehículo en el período
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleFinanceMetrics {
    pub vehicle_id: Uuid,
    pub vehicle_name: String,
    pub rides_count: i64,
    pub total_km: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    /// Redondeado al entero más cercano, 0 cuando total_km = 0
    pub cost_per_km: f64,
    /// Top-3 categorías de gasto, orden descendente, estable en empates
    pub top_expense_categories: Vec<ExpenseCategorySummary>,
}

/// Conjunto completo de métricas de un período
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodMetrics {
    pub rides: RidesMetrics,
    pub cancellations: CancellationsMetrics,
    pub kilometers: KilometersMetrics,
    /// Ordenado por total_income descendente; vacío cuando la etapa
    /// de finanzas por vehículo se omite (períodos diarios)
    pub vehicles: Vec<VehicleFinanceMetrics>,
}
