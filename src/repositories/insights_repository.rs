//! Repositorio del documento de insights
//!
//! El documento se guarda completo como JSONB bajo su clave
//! "{periodType}_{periodId}". Escribir es siempre un upsert de
//! documento completo: regenerar un período sobreescribe, nunca mergea.
//! Los ids canónicos ordenan lexicográficamente en orden cronológico,
//! lo que habilita el listado por recencia.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::insight::InsightsDocument;
use crate::services::report_pipeline::InsightsStore;
use crate::utils::errors::{AppError, AppResult};

pub struct InsightsRepository {
    pool: PgPool,
}

impl InsightsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsightsStore for InsightsRepository {
    async fn upsert(&self, document: &InsightsDocument) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO insights_documents (id, period_type, period_id, document, generated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET document = EXCLUDED.document,
                generated_at = EXCLUDED.generated_at
            "#,
        )
        .bind(&document.id)
        .bind(document.period_type.as_str())
        .bind(&document.period_id)
        .bind(Json(document))
        .bind(document.metadata.generated_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<InsightsDocument>> {
        let row = sqlx::query_scalar::<_, Json<InsightsDocument>>(
            "SELECT document FROM insights_documents WHERE id = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|json| json.0))
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<InsightsDocument>> {
        let rows = sqlx::query_scalar::<_, Json<InsightsDocument>>(
            r#"
            SELECT document FROM insights_documents
            ORDER BY generated_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(|json| json.0).collect())
    }
}
