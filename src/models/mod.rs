//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos: períodos, viajes,
//! finanzas por vehículo, métricas derivadas y documentos de insights.

pub mod insight;
pub mod metrics;
pub mod period;
pub mod ride;
pub mod vehicle;
