mod common;

use common::BillingFixture;
use ledger_core::models::{
    AccountPatch, AccountType, CreateCreditNoteRequest, CreateDebitNoteRequest,
    CreateJournalEntryRequest, JournalLineInput, NoteItemInput, NoteStatus,
};
use ledger_core::services::{AccountRegistry, DashboardService, LedgerEngine};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_dashboard_stats_for_empty_tenant() {
    let pool = common::setup_test_db().await;
    let dashboard = DashboardService::new(pool.clone());

    let stats = dashboard
        .get_dashboard_stats(common::new_tenant())
        .await
        .expect("Failed to load stats");

    assert_eq!(stats.total_accounts, 0);
    assert_eq!(stats.active_accounts, 0);
    assert_eq!(stats.total_journal_entries, 0);
    assert_eq!(stats.draft_journal_entries, 0);
    assert!(stats.credit_notes.is_empty());
    assert!(stats.debit_notes.is_empty());
    assert_eq!(stats.credit_note_total(), dec!(0));
}

#[tokio::test]
async fn test_dashboard_stats_summarize_tenant() {
    let pool = common::setup_test_db().await;
    let registry = AccountRegistry::new(pool.clone());
    let engine = LedgerEngine::new(pool.clone());
    let dashboard = DashboardService::new(pool.clone());
    let fixture = BillingFixture::new(dec!(1160.00));
    let billing = fixture.ledger(pool.clone());
    let tenant_id = fixture.tenant_id;

    let cash =
        common::create_account(&registry, tenant_id, "1000", "Cash", AccountType::Asset).await;
    let sales =
        common::create_account(&registry, tenant_id, "4000", "Sales", AccountType::Revenue).await;
    let legacy =
        common::create_account(&registry, tenant_id, "4900", "Legacy", AccountType::Revenue).await;
    registry
        .update_account(
            tenant_id,
            legacy.id,
            AccountPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to deactivate");

    let mut entry_ids = Vec::new();
    for amount in [dec!(10.00), dec!(20.00), dec!(30.00)] {
        let created = engine
            .create_journal_entry(
                tenant_id,
                CreateJournalEntryRequest {
                    entry_date: common::date(2024, 2, 1),
                    description: "Sale".to_string(),
                    reference: None,
                    lines: vec![
                        JournalLineInput::debit(cash.id, amount),
                        JournalLineInput::credit(sales.id, amount),
                    ],
                },
            )
            .await
            .expect("Failed to create entry");
        entry_ids.push(created.entry.id);
    }
    engine
        .post_journal_entry(tenant_id, entry_ids[0])
        .await
        .expect("Failed to post");

    for _ in 0..2 {
        billing
            .create_credit_note(
                tenant_id,
                CreateCreditNoteRequest {
                    invoice_id: fixture.invoice.id,
                    items: vec![
                        NoteItemInput::new(fixture.products[0], dec!(2), dec!(50.00)),
                        NoteItemInput::new(fixture.products[1], dec!(1), dec!(25.00)),
                    ],
                    reason: "Damaged".to_string(),
                    note_date: common::date(2024, 2, 2),
                    notes: None,
                },
            )
            .await
            .expect("Failed to create credit note");
    }
    billing
        .create_debit_note(
            tenant_id,
            CreateDebitNoteRequest {
                customer_id: fixture.customer_id,
                items: vec![NoteItemInput::new(fixture.products[0], dec!(1), dec!(15.00))],
                reason: "Freight".to_string(),
                note_date: common::date(2024, 2, 3),
                notes: None,
            },
        )
        .await
        .expect("Failed to create debit note");

    let stats = dashboard
        .get_dashboard_stats(tenant_id)
        .await
        .expect("Failed to load stats");

    assert_eq!(stats.total_accounts, 3);
    assert_eq!(stats.active_accounts, 2);
    assert_eq!(stats.total_journal_entries, 3);
    assert_eq!(stats.posted_journal_entries, 1);
    assert_eq!(stats.draft_journal_entries, 2);

    assert_eq!(stats.credit_notes.len(), 1);
    assert_eq!(stats.credit_notes[0].status, NoteStatus::Pending);
    assert_eq!(stats.credit_notes[0].count, 2);
    assert_eq!(stats.credit_notes[0].total, dec!(250.00));
    assert_eq!(stats.credit_note_total(), dec!(250.00));

    assert_eq!(stats.debit_notes.len(), 1);
    assert_eq!(stats.debit_notes[0].count, 1);
    assert_eq!(stats.debit_note_total(), dec!(15.00));
}
