//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación: el
//! álgebra de períodos, el agregador de métricas, la orquestación de
//! insights y el pipeline de reportes.

pub mod insight_service;
pub mod metrics_aggregator;
pub mod period_calculator;
pub mod report_pipeline;
