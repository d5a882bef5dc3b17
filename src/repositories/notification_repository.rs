//! Repositorio de notificaciones - fire and forget
//!
//! Crea un registro dirigido a un rol que referencia el documento
//! generado. Los errores los captura y loguea la etapa 4 del pipeline;
//! nunca se re-lanzan ni afectan el resultado de la corrida.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::insight::InsightsDocument;
use crate::services::report_pipeline::Notifier;
use crate::utils::errors::{AppError, AppResult};

pub struct NotificationRepository {
    pool: PgPool,
    role: String,
}

impl NotificationRepository {
    pub fn new(pool: PgPool, role: String) -> Self {
        Self { pool, role }
    }
}

#[async_trait]
impl Notifier for NotificationRepository {
    async fn notify_document(&self, document: &InsightsDocument) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, role, title, body, document_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&self.role)
        .bind(format!("Reporte {} disponible", document.display_label))
        .bind(format!(
            "Se generó el reporte de desempeño del período {} con {} insights.",
            document.display_label,
            document.insights.len()
        ))
        .bind(&document.id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }
}
