use super::note::NoteStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Count and summed total of notes in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NoteStatusTotal {
    pub status: NoteStatus,
    pub count: i64,
    pub total: Decimal,
}

/// Aggregate counts for a tenant's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_accounts: i64,
    pub active_accounts: i64,
    pub total_journal_entries: i64,
    pub posted_journal_entries: i64,
    pub draft_journal_entries: i64,
    pub credit_notes: Vec<NoteStatusTotal>,
    pub debit_notes: Vec<NoteStatusTotal>,
}

impl DashboardStats {
    pub fn credit_note_total(&self) -> Decimal {
        self.credit_notes.iter().map(|s| s.total).sum()
    }

    pub fn debit_note_total(&self) -> Decimal {
        self.debit_notes.iter().map(|s| s.total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_note_sums() {
        let stats = DashboardStats {
            total_accounts: 3,
            active_accounts: 2,
            total_journal_entries: 5,
            posted_journal_entries: 4,
            draft_journal_entries: 1,
            credit_notes: vec![
                NoteStatusTotal {
                    status: NoteStatus::Pending,
                    count: 2,
                    total: dec!(150.00),
                },
                NoteStatusTotal {
                    status: NoteStatus::Approved,
                    count: 1,
                    total: dec!(25.50),
                },
            ],
            debit_notes: vec![],
        };

        assert_eq!(stats.credit_note_total(), dec!(175.50));
        assert_eq!(stats.debit_note_total(), Decimal::ZERO);
    }
}
