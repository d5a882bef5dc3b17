//! Repositorio de viajes - el data source del pipeline (solo lectura)
//!
//! Tabla de valores por defecto del boundary (se aplica aquí una sola
//! vez, al mapear la fila cruda; nunca se re-deriva aguas abajo):
//! - source ausente        -> platform
//! - distance_unit ausente -> km
//! - montos ausentes       -> 0
//! - distancia ausente     -> 0

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ride::{DistanceUnit, RideRecord, RideSource, RideStatus};
use crate::models::vehicle::{ExpenseEntry, IncomeEntry, VehicleFinanceRecord, VehicleInfo};
use crate::services::report_pipeline::RideDataSource;
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Fila cruda de la tabla rides
#[derive(Debug, sqlx::FromRow)]
struct RideRow {
    driver_id: Uuid,
    vehicle_id: Option<Uuid>,
    ride_at: DateTime<Utc>,
    status: String,
    cancellation_reason: Option<String>,
    source: Option<String>,
    fare_received: Option<f64>,
    commission: Option<f64>,
    total_paid: Option<f64>,
    distance_value: Option<f64>,
    distance_unit: Option<String>,
}

impl From<RideRow> for RideRecord {
    fn from(row: RideRow) -> Self {
        RideRecord {
            driver_id: row.driver_id,
            vehicle_id: row.vehicle_id,
            ride_at: row.ride_at,
            status: match row.status.as_str() {
                "completed" => RideStatus::Completed,
                _ => RideStatus::Cancelled,
            },
            cancellation_reason: row.cancellation_reason,
            source: match row.source.as_deref() {
                Some("external") => RideSource::External,
                _ => RideSource::Platform,
            },
            fare_received: row.fare_received.unwrap_or(0.0),
            commission: row.commission.unwrap_or(0.0),
            total_paid: row.total_paid.unwrap_or(0.0),
            distance_value: row.distance_value.unwrap_or(0.0),
            distance_unit: match row.distance_unit.as_deref() {
                Some("miles") => DistanceUnit::Miles,
                _ => DistanceUnit::Km,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    plate: String,
    brand: Option<String>,
    model: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct IncomeRow {
    entry_type: String,
    amount: f64,
    date: NaiveDate,
}

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    category: String,
    amount: f64,
    date: NaiveDate,
}

pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RideDataSource for RideRepository {
    async fn rides_in_range(
        &self,
        from: NaiveDateTime,
        to_exclusive: NaiveDateTime,
    ) -> AppResult<Vec<RideRecord>> {
        let rows = sqlx::query_as::<_, RideRow>(
            r#"
            SELECT driver_id, vehicle_id, ride_at, status, cancellation_reason,
                   source, fare_received, commission, total_paid,
                   distance_value, distance_unit
            FROM rides
            WHERE ride_at >= $1 AND ride_at < $2
              AND status IN ('completed', 'cancelled')
            ORDER BY ride_at ASC
            "#,
        )
        .bind(from.and_utc())
        .bind(to_exclusive.and_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(RideRecord::from).collect())
    }

    async fn vehicle_finance(
        &self,
        vehicle_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<VehicleFinanceRecord> {
        let vehicle = sqlx::query_as::<_, VehicleRow>(
            "SELECT id, plate, brand, model, year FROM vehicles WHERE id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| not_found_error("Vehicle", &vehicle_id.to_string()))?;

        let income = sqlx::query_as::<_, IncomeRow>(
            r#"
            SELECT entry_type, amount, date
            FROM vehicle_income
            WHERE vehicle_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
        )
        .bind(vehicle_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let expenses = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT category, amount, date
            FROM vehicle_expenses
            WHERE vehicle_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
        )
        .bind(vehicle_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(VehicleFinanceRecord {
            vehicle: VehicleInfo {
                id: vehicle.id,
                plate: vehicle.plate,
                brand: vehicle.brand,
                model: vehicle.model,
                year: vehicle.year,
            },
            income: income
                .into_iter()
                .map(|r| IncomeEntry {
                    entry_type: r.entry_type,
                    amount: r.amount,
                    date: r.date,
                })
                .collect(),
            expenses: expenses
                .into_iter()
                .map(|r| ExpenseEntry {
                    category: r.category,
                    amount: r.amount,
                    date: r.date,
                })
                .collect(),
        })
    }
}
