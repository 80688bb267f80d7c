use super::{group_by, track};
use crate::error::{AppError, Result};
use crate::models::{
    Account, AccountFilter, AccountListing, AccountPatch, AccountRef, CreateAccountRequest, Page,
    PageRequest,
};
use crate::observability::{get_metrics, LatencyTimer};
use crate::repositories::AccountRepository;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Service owning the tenant's chart of accounts.
pub struct AccountRegistry {
    pool: PgPool,
    account_repo: AccountRepository,
}

impl AccountRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            pool,
        }
    }

    /// Creates an account. The code must be unique within the tenant and the
    /// parent, if given, must exist in the same tenant.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, code = %request.code))]
    pub async fn create_account(
        &self,
        tenant_id: Uuid,
        request: CreateAccountRequest,
    ) -> Result<Account> {
        let timer = LatencyTimer::new();
        let result = self.insert_account(tenant_id, request).await;
        get_metrics().record_write_latency("create_account", timer.elapsed_ms());

        let account = track("create_account", result)?;
        get_metrics().record_account_created(account.account_type.as_str());
        info!(account_id = %account.id, code = %account.code, "Account created");

        Ok(account)
    }

    async fn insert_account(
        &self,
        tenant_id: Uuid,
        request: CreateAccountRequest,
    ) -> Result<Account> {
        let request = CreateAccountRequest {
            code: request.code.trim().to_string(),
            name: request.name.trim().to_string(),
            ..request
        };
        request.validate()?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        if self
            .account_repo
            .code_exists(&mut *tx, tenant_id, &request.code, None)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Account code '{}' already exists",
                request.code
            )));
        }

        if let Some(parent_id) = request.parent_id {
            if !self
                .account_repo
                .exists_for_share(&mut *tx, tenant_id, parent_id)
                .await?
            {
                return Err(AppError::NotFound(format!(
                    "Parent account '{}' not found",
                    parent_id
                )));
            }
        }

        let account = Account::new(
            tenant_id,
            request.code,
            request.name,
            request.account_type,
            request.parent_id,
        );
        let created = self.account_repo.insert(&mut *tx, &account).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Applies a partial update. Code uniqueness is re-checked only when the
    /// code changes; a new parent must exist and must not close a cycle.
    #[instrument(skip(self, patch), fields(tenant_id = %tenant_id, account_id = %id))]
    pub async fn update_account(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        patch: AccountPatch,
    ) -> Result<Account> {
        let timer = LatencyTimer::new();
        let result = self.apply_patch(tenant_id, id, patch).await;
        get_metrics().record_write_latency("update_account", timer.elapsed_ms());

        let account = track("update_account", result)?;
        info!(code = %account.code, is_active = account.is_active, "Account updated");

        Ok(account)
    }

    async fn apply_patch(&self, tenant_id: Uuid, id: Uuid, patch: AccountPatch) -> Result<Account> {
        let patch = AccountPatch {
            code: patch.code.map(|code| code.trim().to_string()),
            name: patch.name.map(|name| name.trim().to_string()),
            ..patch
        };
        patch.validate()?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let existing = self
            .account_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account '{}' not found", id)))?;
        let updated = existing.patched(&patch);

        if updated.code != existing.code
            && self
                .account_repo
                .code_exists(&mut *tx, tenant_id, &updated.code, Some(id))
                .await?
        {
            return Err(AppError::Conflict(format!(
                "Account code '{}' already exists",
                updated.code
            )));
        }

        if updated.parent_id != existing.parent_id {
            if let Some(parent_id) = updated.parent_id {
                if parent_id == id {
                    return Err(AppError::Validation(
                        "An account cannot be its own parent".to_string(),
                    ));
                }
                if !self
                    .account_repo
                    .exists_for_share(&mut *tx, tenant_id, parent_id)
                    .await?
                {
                    return Err(AppError::NotFound(format!(
                        "Parent account '{}' not found",
                        parent_id
                    )));
                }
                if self
                    .account_repo
                    .is_ancestor_or_self(&mut *tx, tenant_id, id, parent_id)
                    .await?
                {
                    return Err(AppError::Validation(format!(
                        "Account '{}' cannot be moved under its own descendant '{}'",
                        id, parent_id
                    )));
                }
            }
        }

        let saved = self.account_repo.update(&mut *tx, &updated).await?;

        tx.commit().await?;
        Ok(saved)
    }

    /// Deletes an account that has neither children nor journal lines.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, account_id = %id))]
    pub async fn delete_account(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        let timer = LatencyTimer::new();
        let result = self.remove_account(tenant_id, id).await;
        get_metrics().record_write_latency("delete_account", timer.elapsed_ms());

        track("delete_account", result)?;
        info!("Account deleted");

        Ok(())
    }

    async fn remove_account(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let account = self
            .account_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account '{}' not found", id)))?;

        let children = self
            .account_repo
            .count_children(&mut *tx, tenant_id, id)
            .await?;
        if children > 0 {
            return Err(AppError::Conflict(format!(
                "Account '{}' has {} child account(s)",
                account.code, children
            )));
        }

        let lines = self.account_repo.count_lines(&mut *tx, id).await?;
        if lines > 0 {
            return Err(AppError::Conflict(format!(
                "Account '{}' is referenced by {} journal line(s)",
                account.code, lines
            )));
        }

        if !self.account_repo.delete(&mut *tx, tenant_id, id).await? {
            return Err(AppError::NotFound(format!("Account '{}' not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Lists accounts ordered by code, each with parent, children and usage.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_accounts(
        &self,
        tenant_id: Uuid,
        filter: AccountFilter,
        page: PageRequest,
    ) -> Result<Page<AccountListing>> {
        let result = self.load_listings(tenant_id, &filter, page).await;
        track("list_accounts", result)
    }

    async fn load_listings(
        &self,
        tenant_id: Uuid,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<Page<AccountListing>> {
        let rows = self.account_repo.list(tenant_id, filter, page).await?;
        let total = self.account_repo.count(tenant_id, filter).await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut children = group_by(
            self.account_repo.children_of(tenant_id, &ids).await?,
            |(parent_id, _)| *parent_id,
        );

        let items = rows
            .into_iter()
            .map(|row| {
                let (account, parent, line_count) = row.into_parts();
                let children: Vec<AccountRef> = children
                    .remove(&account.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(_, child)| child)
                    .collect();
                AccountListing {
                    account,
                    parent,
                    children,
                    line_count,
                }
            })
            .collect();

        Ok(Page::new(items, total, page))
    }

    /// Fetches one account with its parent, children and usage.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, account_id = %id))]
    pub async fn get_account_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<AccountListing> {
        let result = self.load_listing(tenant_id, id).await;
        track("get_account_by_id", result)
    }

    async fn load_listing(&self, tenant_id: Uuid, id: Uuid) -> Result<AccountListing> {
        let row = self
            .account_repo
            .find_listing(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account '{}' not found", id)))?;
        let children = self
            .account_repo
            .children_of(tenant_id, &[id])
            .await?
            .into_iter()
            .map(|(_, child)| child)
            .collect();

        let (account, parent, line_count) = row.into_parts();
        Ok(AccountListing {
            account,
            parent,
            children,
            line_count,
        })
    }
}
