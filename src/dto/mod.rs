//! DTOs de la API

pub mod insights_dto;
