use super::search_pattern;
use crate::error::{AppError, Result};
use crate::models::{Account, AccountFilter, AccountRef, AccountType, PageRequest};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Listing row: the account plus parent summary and usage count.
#[derive(Debug, FromRow)]
pub struct AccountListingRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parent_code: Option<String>,
    pub parent_name: Option<String>,
    pub line_count: i64,
}

impl AccountListingRow {
    pub fn into_parts(self) -> (Account, Option<AccountRef>, i64) {
        let parent = match (self.parent_id, self.parent_code, self.parent_name) {
            (Some(id), Some(code), Some(name)) => Some(AccountRef { id, code, name }),
            _ => None,
        };
        let account = Account {
            id: self.id,
            tenant_id: self.tenant_id,
            code: self.code,
            name: self.name,
            account_type: self.account_type,
            parent_id: self.parent_id,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (account, parent, self.line_count)
    }
}

/// Repository for the chart of accounts.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an account. A lost race on the per-tenant code becomes `Conflict`.
    pub async fn insert(&self, conn: &mut PgConnection, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, tenant_id, code, name, account_type, parent_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, tenant_id, code, name, account_type, parent_id, is_active, created_at, updated_at
            "#,
        )
        .bind(account.id)
        .bind(account.tenant_id)
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type)
        .bind(account.parent_id)
        .bind(account.is_active)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || {
                format!("Account code '{}' already exists", account.code)
            })
        })?;

        Ok(row)
    }

    /// Writes every mutable column of an existing account.
    pub async fn update(&self, conn: &mut PgConnection, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET code = $3, name = $4, account_type = $5, parent_id = $6, is_active = $7, updated_at = $8
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, code, name, account_type, parent_id, is_active, created_at, updated_at
            "#,
        )
        .bind(account.tenant_id)
        .bind(account.id)
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type)
        .bind(account.parent_id)
        .bind(account.is_active)
        .bind(account.updated_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || {
                format!("Account code '{}' already exists", account.code)
            })
        })?
        .ok_or_else(|| AppError::NotFound(format!("Account '{}' not found", account.id)))?;

        Ok(row)
    }

    /// Finds an account by id within a tenant.
    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, tenant_id, code, name, account_type, parent_id, is_active, created_at, updated_at
            FROM accounts
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

    /// Loads an account and holds a row lock until the transaction ends.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, tenant_id, code, name, account_type, parent_id, is_active, created_at, updated_at
            FROM accounts
            WHERE tenant_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Loads the given accounts with share locks so they cannot be deleted or
    /// deactivated before the caller commits.
    pub async fn lock_for_posting(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, tenant_id, code, name, account_type, parent_id, is_active, created_at, updated_at
            FROM accounts
            WHERE tenant_id = $1 AND id = ANY($2)
            FOR SHARE
            "#,
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }

    /// Checks whether an account exists in the tenant, share-locking it.
    pub async fn exists_for_share(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM accounts WHERE tenant_id = $1 AND id = $2 FOR SHARE
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.is_some())
    }

    /// Checks if a code is taken in the tenant, optionally ignoring one account.
    pub async fn code_exists(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        code: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM accounts
                WHERE tenant_id = $1 AND code = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(tenant_id)
        .bind(code)
        .bind(excluding)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    /// Returns true if `account_id` is `candidate_parent_id` or one of its ancestors,
    /// i.e. re-parenting would close a cycle.
    pub async fn is_ancestor_or_self(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        account_id: Uuid,
        candidate_parent_id: Uuid,
    ) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            WITH RECURSIVE ancestors AS (
                SELECT id, parent_id FROM accounts WHERE tenant_id = $1 AND id = $3
                UNION
                SELECT a.id, a.parent_id
                FROM accounts a
                JOIN ancestors an ON a.id = an.parent_id
                WHERE a.tenant_id = $1
            )
            SELECT EXISTS(SELECT 1 FROM ancestors WHERE id = $2)
            "#,
        )
        .bind(tenant_id)
        .bind(account_id)
        .bind(candidate_parent_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    pub async fn count_children(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM accounts WHERE tenant_id = $1 AND parent_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    pub async fn count_lines(&self, conn: &mut PgConnection, id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM journal_entry_lines WHERE account_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    /// Deletes an account. Restricting foreign keys turn a concurrent new
    /// reference into `Conflict`.
    pub async fn delete(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM accounts WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_db(e, || format!("Account '{}' is still referenced", id))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists accounts with parent summaries and line usage, ordered by code.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<Vec<AccountListingRow>> {
        let rows = sqlx::query_as::<_, AccountListingRow>(
            r#"
            SELECT a.id, a.tenant_id, a.code, a.name, a.account_type, a.parent_id, a.is_active,
                   a.created_at, a.updated_at,
                   p.code AS parent_code, p.name AS parent_name,
                   (SELECT COUNT(*) FROM journal_entry_lines l WHERE l.account_id = a.id) AS line_count
            FROM accounts a
            LEFT JOIN accounts p ON p.tenant_id = a.tenant_id AND p.id = a.parent_id
            WHERE a.tenant_id = $1
              AND ($2::text IS NULL OR a.code ILIKE $2 OR a.name ILIKE $2)
              AND ($3::account_type IS NULL OR a.account_type = $3)
              AND ($4::boolean IS NULL OR a.is_active = $4)
              AND ($5::uuid IS NULL OR a.parent_id = $5)
            ORDER BY a.code, a.id
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(tenant_id)
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.account_type)
        .bind(filter.is_active)
        .bind(filter.parent_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Counts accounts matching the listing filters.
    pub async fn count(&self, tenant_id: Uuid, filter: &AccountFilter) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM accounts a
            WHERE a.tenant_id = $1
              AND ($2::text IS NULL OR a.code ILIKE $2 OR a.name ILIKE $2)
              AND ($3::account_type IS NULL OR a.account_type = $3)
              AND ($4::boolean IS NULL OR a.is_active = $4)
              AND ($5::uuid IS NULL OR a.parent_id = $5)
            "#,
        )
        .bind(tenant_id)
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.account_type)
        .bind(filter.is_active)
        .bind(filter.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Single listing row by id.
    pub async fn find_listing(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AccountListingRow>> {
        let row = sqlx::query_as::<_, AccountListingRow>(
            r#"
            SELECT a.id, a.tenant_id, a.code, a.name, a.account_type, a.parent_id, a.is_active,
                   a.created_at, a.updated_at,
                   p.code AS parent_code, p.name AS parent_name,
                   (SELECT COUNT(*) FROM journal_entry_lines l WHERE l.account_id = a.id) AS line_count
            FROM accounts a
            LEFT JOIN accounts p ON p.tenant_id = a.tenant_id AND p.id = a.parent_id
            WHERE a.tenant_id = $1 AND a.id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Direct children of the given accounts as `(parent_id, child)` pairs.
    pub async fn children_of(
        &self,
        tenant_id: Uuid,
        parent_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, AccountRef)>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid, Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT parent_id, id, code, name
            FROM accounts
            WHERE tenant_id = $1 AND parent_id = ANY($2)
            ORDER BY code, id
            "#,
        )
        .bind(tenant_id)
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows
            .into_iter()
            .map(|(parent_id, id, code, name)| (parent_id, AccountRef { id, code, name }))
            .collect())
    }

    /// Returns `(total, active)` account counts for a tenant.
    pub async fn count_summary(&self, tenant_id: Uuid) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active)
            FROM accounts
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
