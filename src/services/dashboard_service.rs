use super::track;
use crate::error::Result;
use crate::models::DashboardStats;
use crate::repositories::{AccountRepository, JournalRepository, NoteRepository};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Read-only summary of a tenant's ledger.
pub struct DashboardService {
    account_repo: AccountRepository,
    journal_repo: JournalRepository,
    note_repo: NoteRepository,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            journal_repo: JournalRepository::new(pool.clone()),
            note_repo: NoteRepository::new(pool),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn get_dashboard_stats(&self, tenant_id: Uuid) -> Result<DashboardStats> {
        let result = tokio::try_join!(
            self.account_repo.count_summary(tenant_id),
            self.journal_repo.count_summary(tenant_id),
            self.note_repo.credit_note_status_totals(tenant_id),
            self.note_repo.debit_note_status_totals(tenant_id),
        );
        let (accounts, entries, credit_notes, debit_notes) = track("get_dashboard_stats", result)?;
        let (total_accounts, active_accounts) = accounts;
        let (total_entries, posted_entries) = entries;

        debug!(total_accounts, total_entries, "Dashboard stats computed");

        Ok(DashboardStats {
            total_accounts,
            active_accounts,
            total_journal_entries: total_entries,
            posted_journal_entries: posted_entries,
            draft_journal_entries: total_entries - posted_entries,
            credit_notes,
            debit_notes,
        })
    }
}
