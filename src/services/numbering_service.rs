use crate::error::{AppError, Result};
use crate::models::DocumentType;
use crate::repositories::SequenceRepository;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

/// Hands out tenant-scoped document numbers such as `JE-000001`.
///
/// Values are unique and strictly increasing per `(tenant, document type)`.
/// A number drawn with [`NumberingService::next_in`] is consumed only if the
/// caller's transaction commits.
pub struct NumberingService {
    pool: PgPool,
    sequence_repo: SequenceRepository,
}

impl NumberingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            sequence_repo: SequenceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Draws the next number in its own transaction.
    pub async fn next(&self, tenant_id: Uuid, document_type: DocumentType) -> Result<String> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let number = self.next_in(&mut *tx, tenant_id, document_type).await?;
        tx.commit().await?;

        Ok(number)
    }

    /// Draws the next number on the caller's transaction.
    pub async fn next_in(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        document_type: DocumentType,
    ) -> Result<String> {
        let value = self
            .sequence_repo
            .next_value(conn, tenant_id, document_type)
            .await?;
        let number = document_type.format_number(value);
        debug!(%tenant_id, %document_type, %number, "Document number drawn");

        Ok(number)
    }

    /// Last number handed out, if any.
    pub async fn current(
        &self,
        tenant_id: Uuid,
        document_type: DocumentType,
    ) -> Result<Option<String>> {
        let value = self
            .sequence_repo
            .current_value(tenant_id, document_type)
            .await?;

        Ok(value.map(|v| document_type.format_number(v)))
    }
}
