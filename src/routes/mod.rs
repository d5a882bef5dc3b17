//! Rutas de la API

pub mod insights_routes;
