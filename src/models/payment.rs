use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::collaborators::{InvoiceStatus, PaymentMethod};

/// A payment recorded against an invoice. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub user_id: Uuid,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(tenant_id: Uuid, request: &CreatePaymentRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            invoice_id: request.invoice_id,
            payment_method_id: request.payment_method_id,
            amount: request.amount,
            payment_date: request.payment_date,
            user_id: request.user_id,
            reference: request.reference.clone(),
            notes: request.notes.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Request to record a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub invoice_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    /// User recording the payment, supplied by the caller's auth context.
    pub user_id: Uuid,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Filters accepted by the payment listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFilter {
    pub invoice_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Invoice total versus the payments recorded against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceBalance {
    pub invoice_id: Uuid,
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

impl InvoiceBalance {
    pub fn new(invoice_id: Uuid, total: Decimal, paid: Decimal) -> Self {
        Self {
            invoice_id,
            total,
            paid,
            remaining: total - paid,
        }
    }

    /// Returns true if `amount` fits within the remaining balance.
    pub fn can_accept(&self, amount: Decimal) -> bool {
        amount <= self.remaining
    }

    /// Balance after applying a payment of `amount`.
    pub fn after_payment(&self, amount: Decimal) -> Self {
        Self::new(self.invoice_id, self.total, self.paid + amount)
    }

    pub fn is_settled(&self) -> bool {
        self.remaining <= Decimal::ZERO
    }
}

/// Invoice summary attached to a recorded payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaymentSummary {
    pub id: Uuid,
    pub status: InvoiceStatus,
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

/// Payment method summary attached to a recorded payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&PaymentMethod> for PaymentMethodSummary {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            id: method.id,
            name: method.name.clone(),
        }
    }
}

/// Result of recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: InvoicePaymentSummary,
    pub payment_method: PaymentMethodSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invoice_balance_ceiling() {
        let balance = InvoiceBalance::new(Uuid::new_v4(), dec!(1160.00), dec!(500.00));

        assert_eq!(balance.remaining, dec!(660.00));
        assert!(!balance.can_accept(dec!(660.01)));
        assert!(balance.can_accept(dec!(660.00)));

        let settled = balance.after_payment(dec!(660.00));
        assert_eq!(settled.remaining, dec!(0.00));
        assert!(settled.is_settled());
    }

    #[test]
    fn test_payment_from_request() {
        let tenant_id = Uuid::new_v4();
        let request = CreatePaymentRequest {
            invoice_id: Uuid::new_v4(),
            payment_method_id: Uuid::new_v4(),
            amount: dec!(25.50),
            payment_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            user_id: Uuid::new_v4(),
            reference: Some("TRX-1".to_string()),
            notes: None,
        };

        let payment = Payment::new(tenant_id, &request);
        assert_eq!(payment.tenant_id, tenant_id);
        assert_eq!(payment.invoice_id, request.invoice_id);
        assert_eq!(payment.amount, dec!(25.50));
        assert_eq!(payment.reference.as_deref(), Some("TRX-1"));
    }
}
