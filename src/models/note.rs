use super::money::{fits_money, fits_quantity, is_money, is_quantity, round_money};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Approval state of a credit or debit note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "note_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteStatus {
    Pending,
    Approved,
    Applied,
    Cancelled,
}

/// Adjustment reducing the amount owed on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditNote {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub credit_note_number: String,
    pub invoice_id: Uuid,
    pub reason: String,
    pub note_date: NaiveDate,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub status: NoteStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Adjustment increasing the amount owed by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DebitNote {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub debit_note_number: String,
    pub customer_id: Uuid,
    pub reason: String,
    pub note_date: NaiveDate,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub status: NoteStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Item of a credit or debit note; `note_id` points at the owning header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NoteItem {
    pub id: Uuid,
    pub note_id: Uuid,
    pub line_number: i32,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub reason: Option<String>,
}

impl NoteItem {
    pub fn amount(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNoteWithItems {
    pub note: CreditNote,
    pub items: Vec<NoteItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebitNoteWithItems {
    pub note: DebitNote,
    pub items: Vec<NoteItem>,
}

/// Item as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub reason: Option<String>,
}

impl NoteItemInput {
    pub fn new(product_id: Uuid, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCreditNoteRequest {
    pub invoice_id: Uuid,
    pub items: Vec<NoteItemInput>,
    pub reason: String,
    pub note_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDebitNoteRequest {
    pub customer_id: Uuid,
    pub items: Vec<NoteItemInput>,
    pub reason: String,
    pub note_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditNoteFilter {
    pub invoice_id: Option<Uuid>,
    pub status: Option<NoteStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive match against number or reason.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebitNoteFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<NoteStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

/// Derived amounts of a note. `subtotal == total` since no tax is applied here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTotals {
    pub subtotal: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteItemError {
    NoItems,
    NonPositiveQuantity { item: usize },
    NegativeUnitPrice { item: usize },
    InvalidPrecision { item: usize },
    AmountOutOfRange { item: usize },
    TotalOutOfRange,
}

impl std::fmt::Display for NoteItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteItemError::NoItems => write!(f, "At least one item is required"),
            NoteItemError::NonPositiveQuantity { item } => {
                write!(f, "Item {}: quantity must be positive", item)
            }
            NoteItemError::NegativeUnitPrice { item } => {
                write!(f, "Item {}: unit price cannot be negative", item)
            }
            NoteItemError::InvalidPrecision { item } => {
                write!(f, "Item {}: quantity or unit price has too many decimals", item)
            }
            NoteItemError::AmountOutOfRange { item } => {
                write!(f, "Item {}: amount exceeds the supported range", item)
            }
            NoteItemError::TotalOutOfRange => write!(f, "Note total exceeds the supported range"),
        }
    }
}

impl std::error::Error for NoteItemError {}

/// Validates the items and computes `subtotal = total = Σ(quantity × unit_price)`.
/// Item numbers in errors are 1-based.
pub fn note_totals(items: &[NoteItemInput]) -> Result<NoteTotals, NoteItemError> {
    if items.is_empty() {
        return Err(NoteItemError::NoItems);
    }

    let mut sum = Decimal::ZERO;
    for (index, item) in items.iter().enumerate() {
        let item_no = index + 1;
        if item.quantity <= Decimal::ZERO {
            return Err(NoteItemError::NonPositiveQuantity { item: item_no });
        }
        if item.unit_price < Decimal::ZERO {
            return Err(NoteItemError::NegativeUnitPrice { item: item_no });
        }
        if !is_quantity(&item.quantity) || !is_money(&item.unit_price) {
            return Err(NoteItemError::InvalidPrecision { item: item_no });
        }
        if !fits_quantity(&item.quantity) || !fits_money(&item.unit_price) {
            return Err(NoteItemError::AmountOutOfRange { item: item_no });
        }
        let amount = item
            .quantity
            .checked_mul(item.unit_price)
            .filter(fits_money)
            .ok_or(NoteItemError::AmountOutOfRange { item: item_no })?;
        sum = sum.checked_add(amount).ok_or(NoteItemError::TotalOutOfRange)?;
    }

    let subtotal = round_money(sum);
    if !fits_money(&subtotal) {
        return Err(NoteItemError::TotalOutOfRange);
    }
    Ok(NoteTotals {
        subtotal,
        total: subtotal,
    })
}
