//! Modelo de Ride
//!
//! Este módulo contiene el registro de viaje tal como lo entrega el
//! data source, ya normalizado. Los valores por defecto para campos
//! faltantes se aplican una sola vez en el boundary del repositorio
//! (ver `repositories::ride_repository`), nunca ad hoc aguas abajo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estado terminal de un viaje despachado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Completed,
    Cancelled,
}

/// Origen del viaje
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RideSource {
    /// Despachado por la plataforma
    Platform,
    /// Arreglado directamente ("tipo externo")
    External,
}

/// Unidad de distancia registrada
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Km,
    Miles,
}

/// Registro de viaje normalizado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRecord {
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub ride_at: DateTime<Utc>,
    pub status: RideStatus,
    /// Motivo de cancelación en texto libre ("by_driver", "passenger", etc.)
    pub cancellation_reason: Option<String>,
    pub source: RideSource,
    pub fare_received: f64,
    pub commission: f64,
    pub total_paid: f64,
    pub distance_value: f64,
    pub distance_unit: DistanceUnit,
}

impl RideRecord {
    pub fn is_completed(&self) -> bool {
        self.status == RideStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RideStatus::Cancelled
    }

    /// Distancia del viaje en kilómetros (millas se convierten con 1.60934)
    pub fn distance_km(&self) -> f64 {
        match self.distance_unit {
            DistanceUnit::Km => self.distance_value,
            DistanceUnit::Miles => self.distance_value * 1.60934,
        }
    }
}
