//! Repositorios de acceso a datos
//!
//! Implementaciones PostgreSQL de los colaboradores del pipeline:
//! data source de viajes, store de documentos y notificaciones.

pub mod insights_repository;
pub mod notification_repository;
pub mod ride_repository;
