use super::search_pattern;
use crate::error::{AppError, Result};
use crate::models::{JournalEntry, JournalEntryFilter, JournalEntryLine, PageRequest};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repository for journal entry headers and lines.
pub struct JournalRepository {
    pool: PgPool,
}

impl JournalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a journal entry header.
    pub async fn insert_entry(
        &self,
        conn: &mut PgConnection,
        entry: &JournalEntry,
    ) -> Result<JournalEntry> {
        let row = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO journal_entries (id, tenant_id, entry_number, entry_date, description, reference, total_debit, total_credit, is_posted, posted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, tenant_id, entry_number, entry_date, description, reference, total_debit, total_credit, is_posted, posted_at, created_at, updated_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.tenant_id)
        .bind(&entry.entry_number)
        .bind(entry.entry_date)
        .bind(&entry.description)
        .bind(&entry.reference)
        .bind(entry.total_debit)
        .bind(entry.total_credit)
        .bind(entry.is_posted)
        .bind(entry.posted_at)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || {
                format!("Entry number '{}' is already in use", entry.entry_number)
            })
        })?;

        Ok(row)
    }

    /// Inserts a journal entry line.
    pub async fn insert_line(
        &self,
        conn: &mut PgConnection,
        line: &JournalEntryLine,
    ) -> Result<JournalEntryLine> {
        let row = sqlx::query_as::<_, JournalEntryLine>(
            r#"
            INSERT INTO journal_entry_lines (id, journal_entry_id, line_number, account_id, debit, credit, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, journal_entry_id, line_number, account_id, debit, credit, description
            "#,
        )
        .bind(line.id)
        .bind(line.journal_entry_id)
        .bind(line.line_number)
        .bind(line.account_id)
        .bind(line.debit)
        .bind(line.credit)
        .bind(&line.description)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || {
                format!("Account '{}' was removed while the entry was written", line.account_id)
            })
        })?;

        Ok(row)
    }

    /// Finds an entry header by id within a tenant.
    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>> {
        let row = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, tenant_id, entry_number, entry_date, description, reference, total_debit, total_credit, is_posted, posted_at, created_at, updated_at
            FROM journal_entries
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Lines of the given entries, ordered by entry then line number.
    pub async fn lines_for(&self, entry_ids: &[Uuid]) -> Result<Vec<JournalEntryLine>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, JournalEntryLine>(
            r#"
            SELECT id, journal_entry_id, line_number, account_id, debit, credit, description
            FROM journal_entry_lines
            WHERE journal_entry_id = ANY($1)
            ORDER BY journal_entry_id, line_number
            "#,
        )
        .bind(entry_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Flips a draft entry to posted. Returns `None` if the entry is absent or
    /// was already posted; the guard makes concurrent posts single-winner.
    pub async fn mark_posted(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<JournalEntry>> {
        let row = sqlx::query_as::<_, JournalEntry>(
            r#"
            UPDATE journal_entries
            SET is_posted = TRUE, posted_at = NOW(), updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND is_posted = FALSE
            RETURNING id, tenant_id, entry_number, entry_date, description, reference, total_debit, total_credit, is_posted, posted_at, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists entry headers, newest first.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &JournalEntryFilter,
        page: PageRequest,
    ) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT e.id, e.tenant_id, e.entry_number, e.entry_date, e.description, e.reference, e.total_debit, e.total_credit, e.is_posted, e.posted_at, e.created_at, e.updated_at
            FROM journal_entries e
            WHERE e.tenant_id = $1
              AND ($2::date IS NULL OR e.entry_date >= $2)
              AND ($3::date IS NULL OR e.entry_date <= $3)
              AND ($4::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM journal_entry_lines l
                    WHERE l.journal_entry_id = e.id AND l.account_id = $4))
              AND ($5::text IS NULL OR e.entry_number ILIKE $5 OR e.description ILIKE $5 OR e.reference ILIKE $5)
              AND ($6::boolean IS NULL OR e.is_posted = $6)
            ORDER BY e.created_at DESC, e.id DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(tenant_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.account_id)
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.is_posted)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Counts entries matching the listing filters.
    pub async fn count(&self, tenant_id: Uuid, filter: &JournalEntryFilter) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM journal_entries e
            WHERE e.tenant_id = $1
              AND ($2::date IS NULL OR e.entry_date >= $2)
              AND ($3::date IS NULL OR e.entry_date <= $3)
              AND ($4::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM journal_entry_lines l
                    WHERE l.journal_entry_id = e.id AND l.account_id = $4))
              AND ($5::text IS NULL OR e.entry_number ILIKE $5 OR e.description ILIKE $5 OR e.reference ILIKE $5)
              AND ($6::boolean IS NULL OR e.is_posted = $6)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.account_id)
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.is_posted)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Sums the persisted lines of an entry as `(debits, credits)`.
    pub async fn line_totals(&self, entry_id: Uuid) -> Result<(Decimal, Decimal)> {
        let row: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0)
            FROM journal_entry_lines
            WHERE journal_entry_id = $1
            "#,
        )
        .bind(entry_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Returns `(total, posted)` entry counts for a tenant.
    pub async fn count_summary(&self, tenant_id: Uuid) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_posted)
            FROM journal_entries
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
