use super::{group_by, track, NumberingService};
use crate::collaborators::{
    CustomerCatalog, InvoiceDirectory, InvoiceSnapshot, PaymentMethodDirectory, ProductCatalog,
};
use crate::error::{AppError, Result};
use crate::models::money::{fits_money, is_money};
use crate::models::note::note_totals;
use crate::models::{
    CreateCreditNoteRequest, CreateDebitNoteRequest, CreatePaymentRequest, CreditNote,
    CreditNoteFilter, CreditNoteWithItems, DebitNote, DebitNoteFilter, DebitNoteWithItems,
    DocumentType, InvoiceBalance, InvoicePaymentSummary, NoteItem, NoteItemInput, NoteStatus,
    Page, PageRequest, Payment, PaymentFilter, PaymentReceipt,
};
use crate::observability::{get_metrics, LatencyTimer};
use crate::repositories::{NoteRepository, PaymentRepository};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Reconciles invoices with payments, credit notes and debit notes.
///
/// Invoices, payment methods, customers and products live outside this core
/// and are resolved through the injected collaborators.
pub struct BillingLedger {
    pool: PgPool,
    payment_repo: PaymentRepository,
    note_repo: NoteRepository,
    numbering: NumberingService,
    invoices: Arc<dyn InvoiceDirectory>,
    payment_methods: Arc<dyn PaymentMethodDirectory>,
    customers: Arc<dyn CustomerCatalog>,
    products: Arc<dyn ProductCatalog>,
}

impl BillingLedger {
    pub fn new(
        pool: PgPool,
        invoices: Arc<dyn InvoiceDirectory>,
        payment_methods: Arc<dyn PaymentMethodDirectory>,
        customers: Arc<dyn CustomerCatalog>,
        products: Arc<dyn ProductCatalog>,
    ) -> Self {
        Self {
            payment_repo: PaymentRepository::new(pool.clone()),
            note_repo: NoteRepository::new(pool.clone()),
            numbering: NumberingService::new(pool.clone()),
            pool,
            invoices,
            payment_methods,
            customers,
            products,
        }
    }

    /// Records a payment against an invoice.
    ///
    /// Payment writers for the same invoice are serialized, so the sum of
    /// payments never exceeds the invoice total.
    #[instrument(
        skip(self, request),
        fields(tenant_id = %tenant_id, invoice_id = %request.invoice_id, amount = %request.amount)
    )]
    pub async fn create_payment(
        &self,
        tenant_id: Uuid,
        request: CreatePaymentRequest,
    ) -> Result<PaymentReceipt> {
        let timer = LatencyTimer::new();
        let result = self.record_payment(tenant_id, request).await;
        get_metrics().record_write_latency("create_payment", timer.elapsed_ms());

        let receipt = track("create_payment", result)?;
        let settled = receipt.invoice.remaining.is_zero();
        get_metrics().record_payment_recorded(settled);
        info!(
            payment_id = %receipt.payment.id,
            remaining = %receipt.invoice.remaining,
            settled,
            "Payment recorded"
        );

        Ok(receipt)
    }

    async fn record_payment(
        &self,
        tenant_id: Uuid,
        request: CreatePaymentRequest,
    ) -> Result<PaymentReceipt> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }
        if !is_money(&request.amount) {
            return Err(AppError::Validation(
                "Payment amount cannot be finer than the smallest currency unit".to_string(),
            ));
        }
        if !fits_money(&request.amount) {
            return Err(AppError::Validation(
                "Payment amount exceeds the supported range".to_string(),
            ));
        }

        let invoice = self.resolve_invoice(tenant_id, request.invoice_id).await?;
        if !invoice.status.accepts_payments() {
            return Err(AppError::Validation(format!(
                "Invoice '{}' is cancelled and cannot receive payments",
                invoice.id
            )));
        }

        let method = self
            .payment_methods
            .get_payment_method(tenant_id, request.payment_method_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Payment method '{}' not found",
                    request.payment_method_id
                ))
            })?;
        if !method.is_active {
            return Err(AppError::Validation(format!(
                "Payment method '{}' is inactive",
                method.name
            )));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        self.payment_repo
            .lock_invoice(&mut *tx, tenant_id, invoice.id)
            .await?;
        let paid = self
            .payment_repo
            .paid_total_in(&mut *tx, tenant_id, invoice.id)
            .await?;
        let balance = InvoiceBalance::new(invoice.id, invoice.total, paid);

        if !balance.can_accept(request.amount) {
            return Err(AppError::Conflict(format!(
                "Payment of {} exceeds the remaining balance of {} on invoice '{}'",
                request.amount, balance.remaining, invoice.id
            )));
        }

        let payment = Payment::new(tenant_id, &request);
        let payment = self.payment_repo.insert(&mut *tx, &payment).await?;

        tx.commit().await?;

        let after = balance.after_payment(payment.amount);
        Ok(PaymentReceipt {
            invoice: InvoicePaymentSummary {
                id: invoice.id,
                status: invoice.status,
                total: after.total,
                paid: after.paid,
                remaining: after.remaining,
            },
            payment_method: (&method).into(),
            payment,
        })
    }

    /// Lists payments, most recent payment date first.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_payments(
        &self,
        tenant_id: Uuid,
        filter: PaymentFilter,
        page: PageRequest,
    ) -> Result<Page<Payment>> {
        let result = async {
            let items = self.payment_repo.list(tenant_id, &filter, page).await?;
            let total = self.payment_repo.count(tenant_id, &filter).await?;
            Ok::<_, AppError>(Page::new(items, total, page))
        }
        .await;

        track("list_payments", result)
    }

    /// Current total, paid and remaining amounts of an invoice.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn invoice_balance(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceBalance> {
        let result = async {
            let invoice = self.resolve_invoice(tenant_id, invoice_id).await?;
            let paid = self.payment_repo.paid_total(tenant_id, invoice.id).await?;
            Ok::<_, AppError>(InvoiceBalance::new(invoice.id, invoice.total, paid))
        }
        .await;

        track("invoice_balance", result)
    }

    /// Issues a credit note against an invoice. The invoice total is not
    /// adjusted.
    #[instrument(
        skip(self, request),
        fields(
            tenant_id = %tenant_id,
            invoice_id = %request.invoice_id,
            items = request.items.len()
        )
    )]
    pub async fn create_credit_note(
        &self,
        tenant_id: Uuid,
        request: CreateCreditNoteRequest,
    ) -> Result<CreditNoteWithItems> {
        let timer = LatencyTimer::new();
        let result = self.write_credit_note(tenant_id, request).await;
        get_metrics().record_write_latency("create_credit_note", timer.elapsed_ms());

        let created = track("create_credit_note", result)?;
        get_metrics().record_note_created("credit");
        info!(
            note_id = %created.note.id,
            credit_note_number = %created.note.credit_note_number,
            total = %created.note.total,
            "Credit note created"
        );

        Ok(created)
    }

    async fn write_credit_note(
        &self,
        tenant_id: Uuid,
        request: CreateCreditNoteRequest,
    ) -> Result<CreditNoteWithItems> {
        let totals = note_totals(&request.items).map_err(|e| AppError::Validation(e.to_string()))?;
        let reason = required_reason(&request.reason)?;

        let invoice = self.resolve_invoice(tenant_id, request.invoice_id).await?;
        if !invoice.status.accepts_credit_notes() {
            return Err(AppError::Validation(format!(
                "Invoice '{}' is cancelled and cannot receive credit notes",
                invoice.id
            )));
        }
        self.ensure_products(tenant_id, &request.items).await?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let credit_note_number = self
            .numbering
            .next_in(&mut *tx, tenant_id, DocumentType::CreditNote)
            .await?;
        let note = CreditNote {
            id: Uuid::new_v4(),
            tenant_id,
            credit_note_number,
            invoice_id: invoice.id,
            reason,
            note_date: request.note_date,
            subtotal: totals.subtotal,
            total: totals.total,
            status: NoteStatus::Pending,
            notes: request.notes,
            created_at: Utc::now(),
        };
        let note = self.note_repo.insert_credit_note(&mut *tx, &note).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in note_items(note.id, request.items) {
            items.push(self.note_repo.insert_credit_note_item(&mut *tx, &item).await?);
        }

        tx.commit().await?;
        Ok(CreditNoteWithItems { note, items })
    }

    /// Issues a debit note to a customer.
    #[instrument(
        skip(self, request),
        fields(
            tenant_id = %tenant_id,
            customer_id = %request.customer_id,
            items = request.items.len()
        )
    )]
    pub async fn create_debit_note(
        &self,
        tenant_id: Uuid,
        request: CreateDebitNoteRequest,
    ) -> Result<DebitNoteWithItems> {
        let timer = LatencyTimer::new();
        let result = self.write_debit_note(tenant_id, request).await;
        get_metrics().record_write_latency("create_debit_note", timer.elapsed_ms());

        let created = track("create_debit_note", result)?;
        get_metrics().record_note_created("debit");
        info!(
            note_id = %created.note.id,
            debit_note_number = %created.note.debit_note_number,
            total = %created.note.total,
            "Debit note created"
        );

        Ok(created)
    }

    async fn write_debit_note(
        &self,
        tenant_id: Uuid,
        request: CreateDebitNoteRequest,
    ) -> Result<DebitNoteWithItems> {
        let totals = note_totals(&request.items).map_err(|e| AppError::Validation(e.to_string()))?;
        let reason = required_reason(&request.reason)?;

        if !self
            .customers
            .customer_exists(tenant_id, request.customer_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "Customer '{}' not found",
                request.customer_id
            )));
        }
        self.ensure_products(tenant_id, &request.items).await?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let debit_note_number = self
            .numbering
            .next_in(&mut *tx, tenant_id, DocumentType::DebitNote)
            .await?;
        let note = DebitNote {
            id: Uuid::new_v4(),
            tenant_id,
            debit_note_number,
            customer_id: request.customer_id,
            reason,
            note_date: request.note_date,
            subtotal: totals.subtotal,
            total: totals.total,
            status: NoteStatus::Pending,
            notes: request.notes,
            created_at: Utc::now(),
        };
        let note = self.note_repo.insert_debit_note(&mut *tx, &note).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in note_items(note.id, request.items) {
            items.push(self.note_repo.insert_debit_note_item(&mut *tx, &item).await?);
        }

        tx.commit().await?;
        Ok(DebitNoteWithItems { note, items })
    }

    /// Lists credit notes with their items, newest first.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_credit_notes(
        &self,
        tenant_id: Uuid,
        filter: CreditNoteFilter,
        page: PageRequest,
    ) -> Result<Page<CreditNoteWithItems>> {
        let result = async {
            let notes = self.note_repo.list_credit_notes(tenant_id, &filter, page).await?;
            let total = self.note_repo.count_credit_notes(tenant_id, &filter).await?;

            let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
            let mut items = group_by(self.note_repo.credit_note_items(&ids).await?, |item| {
                item.note_id
            });
            let notes = notes
                .into_iter()
                .map(|note| CreditNoteWithItems {
                    items: items.remove(&note.id).unwrap_or_default(),
                    note,
                })
                .collect();

            Ok::<_, AppError>(Page::new(notes, total, page))
        }
        .await;

        track("list_credit_notes", result)
    }

    /// Lists debit notes with their items, newest first.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_debit_notes(
        &self,
        tenant_id: Uuid,
        filter: DebitNoteFilter,
        page: PageRequest,
    ) -> Result<Page<DebitNoteWithItems>> {
        let result = async {
            let notes = self.note_repo.list_debit_notes(tenant_id, &filter, page).await?;
            let total = self.note_repo.count_debit_notes(tenant_id, &filter).await?;

            let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
            let mut items = group_by(self.note_repo.debit_note_items(&ids).await?, |item| {
                item.note_id
            });
            let notes = notes
                .into_iter()
                .map(|note| DebitNoteWithItems {
                    items: items.remove(&note.id).unwrap_or_default(),
                    note,
                })
                .collect();

            Ok::<_, AppError>(Page::new(notes, total, page))
        }
        .await;

        track("list_debit_notes", result)
    }

    async fn resolve_invoice(&self, tenant_id: Uuid, invoice_id: Uuid) -> Result<InvoiceSnapshot> {
        self.invoices
            .get_invoice(tenant_id, invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice '{}' not found", invoice_id)))
    }

    async fn ensure_products(&self, tenant_id: Uuid, items: &[NoteItemInput]) -> Result<()> {
        let mut product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let missing = self
            .products
            .missing_products(tenant_id, &product_ids)
            .await?;
        if missing.is_empty() {
            return Ok(());
        }

        let missing: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        Err(AppError::NotFound(format!(
            "Product(s) not found: {}",
            missing.join(", ")
        )))
    }
}

fn required_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("A reason is required".to_string()));
    }
    Ok(reason.to_string())
}

/// Numbers the submitted items from 1 in submission order.
fn note_items(note_id: Uuid, inputs: Vec<NoteItemInput>) -> Vec<NoteItem> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| NoteItem {
            id: Uuid::new_v4(),
            note_id,
            line_number: index as i32 + 1,
            product_id: input.product_id,
            quantity: input.quantity,
            unit_price: input.unit_price,
            reason: input.reason,
        })
        .collect()
}
