use super::search_pattern;
use crate::error::{AppError, Result};
use crate::models::{
    CreditNote, CreditNoteFilter, DebitNote, DebitNoteFilter, NoteItem, NoteStatusTotal,
    PageRequest,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repository for credit notes, debit notes and their items.
pub struct NoteRepository {
    pool: PgPool,
}

impl NoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_credit_note(
        &self,
        conn: &mut PgConnection,
        note: &CreditNote,
    ) -> Result<CreditNote> {
        let row = sqlx::query_as::<_, CreditNote>(
            r#"
            INSERT INTO credit_notes (id, tenant_id, credit_note_number, invoice_id, reason, note_date, subtotal, total, status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, tenant_id, credit_note_number, invoice_id, reason, note_date, subtotal, total, status, notes, created_at
            "#,
        )
        .bind(note.id)
        .bind(note.tenant_id)
        .bind(&note.credit_note_number)
        .bind(note.invoice_id)
        .bind(&note.reason)
        .bind(note.note_date)
        .bind(note.subtotal)
        .bind(note.total)
        .bind(note.status)
        .bind(&note.notes)
        .bind(note.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || {
                format!("Credit note number '{}' is already in use", note.credit_note_number)
            })
        })?;

        Ok(row)
    }

    pub async fn insert_credit_note_item(
        &self,
        conn: &mut PgConnection,
        item: &NoteItem,
    ) -> Result<NoteItem> {
        let row = sqlx::query_as::<_, NoteItem>(
            r#"
            INSERT INTO credit_note_items (id, credit_note_id, line_number, product_id, quantity, unit_price, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, credit_note_id AS note_id, line_number, product_id, quantity, unit_price, reason
            "#,
        )
        .bind(item.id)
        .bind(item.note_id)
        .bind(item.line_number)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.reason)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row)
    }

    pub async fn insert_debit_note(
        &self,
        conn: &mut PgConnection,
        note: &DebitNote,
    ) -> Result<DebitNote> {
        let row = sqlx::query_as::<_, DebitNote>(
            r#"
            INSERT INTO debit_notes (id, tenant_id, debit_note_number, customer_id, reason, note_date, subtotal, total, status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, tenant_id, debit_note_number, customer_id, reason, note_date, subtotal, total, status, notes, created_at
            "#,
        )
        .bind(note.id)
        .bind(note.tenant_id)
        .bind(&note.debit_note_number)
        .bind(note.customer_id)
        .bind(&note.reason)
        .bind(note.note_date)
        .bind(note.subtotal)
        .bind(note.total)
        .bind(note.status)
        .bind(&note.notes)
        .bind(note.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || {
                format!("Debit note number '{}' is already in use", note.debit_note_number)
            })
        })?;

        Ok(row)
    }

    pub async fn insert_debit_note_item(
        &self,
        conn: &mut PgConnection,
        item: &NoteItem,
    ) -> Result<NoteItem> {
        let row = sqlx::query_as::<_, NoteItem>(
            r#"
            INSERT INTO debit_note_items (id, debit_note_id, line_number, product_id, quantity, unit_price, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, debit_note_id AS note_id, line_number, product_id, quantity, unit_price, reason
            "#,
        )
        .bind(item.id)
        .bind(item.note_id)
        .bind(item.line_number)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.reason)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row)
    }

    pub async fn list_credit_notes(
        &self,
        tenant_id: Uuid,
        filter: &CreditNoteFilter,
        page: PageRequest,
    ) -> Result<Vec<CreditNote>> {
        let rows = sqlx::query_as::<_, CreditNote>(
            r#"
            SELECT id, tenant_id, credit_note_number, invoice_id, reason, note_date, subtotal, total, status, notes, created_at
            FROM credit_notes
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR invoice_id = $2)
              AND ($3::note_status IS NULL OR status = $3)
              AND ($4::date IS NULL OR note_date >= $4)
              AND ($5::date IS NULL OR note_date <= $5)
              AND ($6::text IS NULL OR credit_note_number ILIKE $6 OR reason ILIKE $6)
            ORDER BY created_at DESC, id DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(tenant_id)
        .bind(filter.invoice_id)
        .bind(filter.status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(search_pattern(filter.search.as_deref()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn count_credit_notes(
        &self,
        tenant_id: Uuid,
        filter: &CreditNoteFilter,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM credit_notes
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR invoice_id = $2)
              AND ($3::note_status IS NULL OR status = $3)
              AND ($4::date IS NULL OR note_date >= $4)
              AND ($5::date IS NULL OR note_date <= $5)
              AND ($6::text IS NULL OR credit_note_number ILIKE $6 OR reason ILIKE $6)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.invoice_id)
        .bind(filter.status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(search_pattern(filter.search.as_deref()))
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    pub async fn credit_note_items(&self, note_ids: &[Uuid]) -> Result<Vec<NoteItem>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, NoteItem>(
            r#"
            SELECT id, credit_note_id AS note_id, line_number, product_id, quantity, unit_price, reason
            FROM credit_note_items
            WHERE credit_note_id = ANY($1)
            ORDER BY credit_note_id, line_number
            "#,
        )
        .bind(note_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn list_debit_notes(
        &self,
        tenant_id: Uuid,
        filter: &DebitNoteFilter,
        page: PageRequest,
    ) -> Result<Vec<DebitNote>> {
        let rows = sqlx::query_as::<_, DebitNote>(
            r#"
            SELECT id, tenant_id, debit_note_number, customer_id, reason, note_date, subtotal, total, status, notes, created_at
            FROM debit_notes
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::note_status IS NULL OR status = $3)
              AND ($4::date IS NULL OR note_date >= $4)
              AND ($5::date IS NULL OR note_date <= $5)
              AND ($6::text IS NULL OR debit_note_number ILIKE $6 OR reason ILIKE $6)
            ORDER BY created_at DESC, id DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(tenant_id)
        .bind(filter.customer_id)
        .bind(filter.status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(search_pattern(filter.search.as_deref()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn count_debit_notes(
        &self,
        tenant_id: Uuid,
        filter: &DebitNoteFilter,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM debit_notes
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::note_status IS NULL OR status = $3)
              AND ($4::date IS NULL OR note_date >= $4)
              AND ($5::date IS NULL OR note_date <= $5)
              AND ($6::text IS NULL OR debit_note_number ILIKE $6 OR reason ILIKE $6)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.customer_id)
        .bind(filter.status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(search_pattern(filter.search.as_deref()))
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    pub async fn debit_note_items(&self, note_ids: &[Uuid]) -> Result<Vec<NoteItem>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, NoteItem>(
            r#"
            SELECT id, debit_note_id AS note_id, line_number, product_id, quantity, unit_price, reason
            FROM debit_note_items
            WHERE debit_note_id = ANY($1)
            ORDER BY debit_note_id, line_number
            "#,
        )
        .bind(note_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Count and summed total of credit notes per status.
    pub async fn credit_note_status_totals(&self, tenant_id: Uuid) -> Result<Vec<NoteStatusTotal>> {
        let rows = sqlx::query_as::<_, NoteStatusTotal>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total), 0) AS total
            FROM credit_notes
            WHERE tenant_id = $1
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Count and summed total of debit notes per status.
    pub async fn debit_note_status_totals(&self, tenant_id: Uuid) -> Result<Vec<NoteStatusTotal>> {
        let rows = sqlx::query_as::<_, NoteStatusTotal>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total), 0) AS total
            FROM debit_notes
            WHERE tenant_id = $1
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
