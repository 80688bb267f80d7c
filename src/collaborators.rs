//! Read-only ports to systems outside the ledger core.
//!
//! The core never writes through these traits. Implementations are injected
//! into [`crate::services::BillingLedger`] as `Arc<dyn ...>` handles.

use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice lifecycle as reported by the invoicing module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Cancelled invoices no longer accept payments.
    pub fn accepts_payments(&self) -> bool {
        !matches!(self, InvoiceStatus::Cancelled)
    }

    pub fn accepts_credit_notes(&self) -> bool {
        !matches!(self, InvoiceStatus::Cancelled)
    }
}

/// The subset of an invoice the billing ledger reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub id: Uuid,
    pub total: Decimal,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

#[async_trait]
pub trait InvoiceDirectory: Send + Sync {
    async fn get_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceSnapshot>>;
}

#[async_trait]
pub trait PaymentMethodDirectory: Send + Sync {
    async fn get_payment_method(
        &self,
        tenant_id: Uuid,
        payment_method_id: Uuid,
    ) -> Result<Option<PaymentMethod>>;
}

#[async_trait]
pub trait CustomerCatalog: Send + Sync {
    async fn customer_exists(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the ids from `product_ids` that do not exist for the tenant.
    async fn missing_products(
        &self,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<Uuid>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_status_accepts_payments() {
        assert!(InvoiceStatus::Issued.accepts_payments());
        assert!(InvoiceStatus::PartiallyPaid.accepts_payments());
        assert!(InvoiceStatus::Overdue.accepts_payments());
        assert!(!InvoiceStatus::Cancelled.accepts_payments());
    }

    #[test]
    fn test_invoice_status_accepts_credit_notes() {
        assert!(InvoiceStatus::Issued.accepts_credit_notes());
        assert!(InvoiceStatus::Paid.accepts_credit_notes());
        assert!(!InvoiceStatus::Cancelled.accepts_credit_notes());
    }
}
