use crate::error::{AppError, Result};
use crate::models::{PageRequest, Payment, PaymentFilter};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repository for invoice payments.
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serializes payment writers for one invoice until the transaction ends.
    pub async fn lock_invoice(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("payment:{}:{}", tenant_id, invoice_id))
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Sum of payments for an invoice, read on the caller's transaction.
    pub async fn paid_total_in(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Decimal> {
        sum_paid(&mut *conn, tenant_id, invoice_id).await
    }

    /// Sum of payments for an invoice.
    pub async fn paid_total(&self, tenant_id: Uuid, invoice_id: Uuid) -> Result<Decimal> {
        sum_paid(&self.pool, tenant_id, invoice_id).await
    }

    /// Inserts a payment.
    pub async fn insert(&self, conn: &mut PgConnection, payment: &Payment) -> Result<Payment> {
        let row = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, tenant_id, invoice_id, payment_method_id, amount, payment_date, user_id, reference, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, tenant_id, invoice_id, payment_method_id, amount, payment_date, user_id, reference, notes, created_at
            "#,
        )
        .bind(payment.id)
        .bind(payment.tenant_id)
        .bind(payment.invoice_id)
        .bind(payment.payment_method_id)
        .bind(payment.amount)
        .bind(payment.payment_date)
        .bind(payment.user_id)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Lists payments, most recent payment date first.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, tenant_id, invoice_id, payment_method_id, amount, payment_date, user_id, reference, notes, created_at
            FROM payments
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR invoice_id = $2)
              AND ($3::uuid IS NULL OR payment_method_id = $3)
              AND ($4::date IS NULL OR payment_date >= $4)
              AND ($5::date IS NULL OR payment_date <= $5)
            ORDER BY payment_date DESC, created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(tenant_id)
        .bind(filter.invoice_id)
        .bind(filter.payment_method_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn count(&self, tenant_id: Uuid, filter: &PaymentFilter) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM payments
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR invoice_id = $2)
              AND ($3::uuid IS NULL OR payment_method_id = $3)
              AND ($4::date IS NULL OR payment_date >= $4)
              AND ($5::date IS NULL OR payment_date <= $5)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.invoice_id)
        .bind(filter.payment_method_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }
}

async fn sum_paid<'e, E>(executor: E, tenant_id: Uuid, invoice_id: Uuid) -> Result<Decimal>
where
    E: PgExecutor<'e>,
{
    let row: (Decimal,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM payments
        WHERE tenant_id = $1 AND invoice_id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(invoice_id)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}
