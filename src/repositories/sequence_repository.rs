use crate::error::{AppError, Result};
use crate::models::DocumentType;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repository for per-tenant document counters.
pub struct SequenceRepository {
    pool: PgPool,
}

impl SequenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Increments and returns the counter for `(tenant_id, document_type)`,
    /// creating it at 1 on first use.
    ///
    /// The upsert keeps the counter row locked until the caller's transaction
    /// ends, so concurrent callers are handed distinct values in commit order.
    pub async fn next_value(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        document_type: DocumentType,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO document_sequences (tenant_id, document_type, last_value, updated_at)
            VALUES ($1, $2, 1, NOW())
            ON CONFLICT (tenant_id, document_type)
            DO UPDATE SET last_value = document_sequences.last_value + 1, updated_at = NOW()
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .bind(document_type.prefix())
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    /// Last value handed out, or `None` if the counter was never used.
    pub async fn current_value(
        &self,
        tenant_id: Uuid,
        document_type: DocumentType,
    ) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT last_value
            FROM document_sequences
            WHERE tenant_id = $1 AND document_type = $2
            "#,
        )
        .bind(tenant_id)
        .bind(document_type.prefix())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|r| r.0))
    }
}
