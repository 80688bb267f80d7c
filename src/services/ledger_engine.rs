use super::{group_by, track, NumberingService};
use crate::error::{AppError, Result};
use crate::models::journal_entry::balanced_totals;
use crate::models::{
    Account, CreateJournalEntryRequest, DocumentType, JournalEntry, JournalEntryFilter,
    JournalEntryLine, JournalEntryWithLines, Page, PageRequest,
};
use crate::observability::{get_metrics, LatencyTimer};
use crate::repositories::{AccountRepository, JournalRepository};
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Double-entry journal engine.
///
/// Entries are created as drafts with balanced lines and move to posted
/// exactly once. Posted entries are never modified.
pub struct LedgerEngine {
    pool: PgPool,
    account_repo: AccountRepository,
    journal_repo: JournalRepository,
    numbering: NumberingService,
}

impl LedgerEngine {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            journal_repo: JournalRepository::new(pool.clone()),
            numbering: NumberingService::new(pool.clone()),
            pool,
        }
    }

    /// Creates a draft journal entry.
    ///
    /// Lines are validated and balanced before any database access. Inside the
    /// transaction every referenced account is share-locked and must be active.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, lines = request.lines.len()))]
    pub async fn create_journal_entry(
        &self,
        tenant_id: Uuid,
        request: CreateJournalEntryRequest,
    ) -> Result<JournalEntryWithLines> {
        let timer = LatencyTimer::new();
        let result = self.write_entry(tenant_id, request).await;
        get_metrics().record_write_latency("create_journal_entry", timer.elapsed_ms());

        let created = track("create_journal_entry", result)?;
        get_metrics().record_journal_entry_created(created.lines.len());
        info!(
            entry_id = %created.entry.id,
            entry_number = %created.entry.entry_number,
            total = %created.entry.total_debit,
            "Journal entry created"
        );

        Ok(created)
    }

    async fn write_entry(
        &self,
        tenant_id: Uuid,
        request: CreateJournalEntryRequest,
    ) -> Result<JournalEntryWithLines> {
        let totals =
            balanced_totals(&request.lines).map_err(|e| AppError::Validation(e.to_string()))?;

        let description = request.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::Validation(
                "Journal entry description cannot be empty".to_string(),
            ));
        }
        let reference = request
            .reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let mut account_ids: Vec<Uuid> = request.lines.iter().map(|l| l.account_id).collect();
        account_ids.sort();
        account_ids.dedup();

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let accounts: HashMap<Uuid, Account> = self
            .account_repo
            .lock_for_posting(&mut *tx, tenant_id, &account_ids)
            .await?
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        for account_id in &account_ids {
            match accounts.get(account_id) {
                None => {
                    return Err(AppError::Validation(format!(
                        "Account '{}' not found",
                        account_id
                    )))
                }
                Some(account) if !account.accepts_postings() => {
                    return Err(AppError::Validation(format!(
                        "Account '{}' is inactive",
                        account.code
                    )))
                }
                Some(_) => {}
            }
        }

        let entry_number = self
            .numbering
            .next_in(&mut *tx, tenant_id, DocumentType::JournalEntry)
            .await?;

        let now = Utc::now();
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            tenant_id,
            entry_number,
            entry_date: request.entry_date,
            description,
            reference,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            is_posted: false,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        let entry = self.journal_repo.insert_entry(&mut *tx, &entry).await?;

        let mut lines = Vec::with_capacity(request.lines.len());
        for (index, input) in request.lines.into_iter().enumerate() {
            let line = JournalEntryLine {
                id: Uuid::new_v4(),
                journal_entry_id: entry.id,
                line_number: index as i32 + 1,
                account_id: input.account_id,
                debit: input.debit,
                credit: input.credit,
                description: input.description,
            };
            lines.push(self.journal_repo.insert_line(&mut *tx, &line).await?);
        }

        tx.commit().await?;
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Posts a draft entry. Posting an already posted entry is a `Conflict`.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, entry_id = %id))]
    pub async fn post_journal_entry(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<JournalEntryWithLines> {
        let timer = LatencyTimer::new();
        let result = self.mark_posted(tenant_id, id).await;
        get_metrics().record_write_latency("post_journal_entry", timer.elapsed_ms());

        let posted = track("post_journal_entry", result)?;
        get_metrics().record_journal_entry_posted();
        info!(entry_number = %posted.entry.entry_number, "Journal entry posted");

        Ok(posted)
    }

    async fn mark_posted(&self, tenant_id: Uuid, id: Uuid) -> Result<JournalEntryWithLines> {
        let entry = match self.journal_repo.mark_posted(tenant_id, id).await? {
            Some(entry) => entry,
            None => {
                return match self.journal_repo.find_by_id(tenant_id, id).await? {
                    Some(existing) => Err(AppError::Conflict(format!(
                        "Journal entry '{}' is already posted",
                        existing.entry_number
                    ))),
                    None => Err(AppError::NotFound(format!(
                        "Journal entry '{}' not found",
                        id
                    ))),
                }
            }
        };

        let lines = self.journal_repo.lines_for(&[entry.id]).await?;
        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Lists entries with their lines, newest first.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_journal_entries(
        &self,
        tenant_id: Uuid,
        filter: JournalEntryFilter,
        page: PageRequest,
    ) -> Result<Page<JournalEntryWithLines>> {
        let result = self.load_entries(tenant_id, &filter, page).await;
        track("list_journal_entries", result)
    }

    async fn load_entries(
        &self,
        tenant_id: Uuid,
        filter: &JournalEntryFilter,
        page: PageRequest,
    ) -> Result<Page<JournalEntryWithLines>> {
        let entries = self.journal_repo.list(tenant_id, filter, page).await?;
        let total = self.journal_repo.count(tenant_id, filter).await?;

        let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
        let mut lines = group_by(self.journal_repo.lines_for(&ids).await?, |line| {
            line.journal_entry_id
        });

        let items = entries
            .into_iter()
            .map(|entry| {
                let lines = lines.remove(&entry.id).unwrap_or_default();
                JournalEntryWithLines { entry, lines }
            })
            .collect();

        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, entry_id = %id))]
    pub async fn get_journal_entry_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<JournalEntryWithLines> {
        let result = self.load_entry(tenant_id, id).await;
        track("get_journal_entry_by_id", result)
    }

    async fn load_entry(&self, tenant_id: Uuid, id: Uuid) -> Result<JournalEntryWithLines> {
        let entry = self
            .journal_repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Journal entry '{}' not found", id)))?;
        let lines = self.journal_repo.lines_for(&[entry.id]).await?;

        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Recomputes the entry's line sums from the store and compares them with
    /// the header totals.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, entry_id = %id))]
    pub async fn verify_entry_balance(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let entry = track(
            "verify_entry_balance",
            self.journal_repo
                .find_by_id(tenant_id, id)
                .await
                .and_then(|entry| {
                    entry.ok_or_else(|| {
                        AppError::NotFound(format!("Journal entry '{}' not found", id))
                    })
                }),
        )?;
        let (debits, credits) = self.journal_repo.line_totals(entry.id).await?;

        let consistent = entry.is_balanced()
            && debits == entry.total_debit
            && credits == entry.total_credit;
        if !consistent {
            warn!(
                entry_number = %entry.entry_number,
                header_debit = %entry.total_debit,
                header_credit = %entry.total_credit,
                line_debit = %debits,
                line_credit = %credits,
                "Journal entry totals do not match its lines"
            );
        }

        Ok(consistent)
    }
}
