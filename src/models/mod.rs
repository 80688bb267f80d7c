pub mod account;
pub mod dashboard;
pub mod document;
pub mod journal_entry;
pub mod money;
pub mod note;
pub mod pagination;
pub mod payment;

pub use account::{
    Account, AccountFilter, AccountListing, AccountPatch, AccountRef, AccountType,
    CreateAccountRequest,
};
pub use dashboard::{DashboardStats, NoteStatusTotal};
pub use document::DocumentType;
pub use journal_entry::{
    CreateJournalEntryRequest, EntryState, EntryTotals, JournalEntry, JournalEntryFilter,
    JournalEntryLine, JournalEntryWithLines, JournalLineInput,
};
pub use note::{
    CreateCreditNoteRequest, CreateDebitNoteRequest, CreditNote, CreditNoteFilter,
    CreditNoteWithItems, DebitNote, DebitNoteFilter, DebitNoteWithItems, NoteItem,
    NoteItemInput, NoteStatus, NoteTotals,
};
pub use pagination::{Page, PageRequest};
pub use payment::{
    CreatePaymentRequest, InvoiceBalance, InvoicePaymentSummary, Payment, PaymentFilter,
    PaymentMethodSummary, PaymentReceipt,
};
