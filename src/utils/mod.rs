//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores y
//! funcionalidades comunes.

pub mod errors;
