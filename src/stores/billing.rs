//! Invoices and payments.
//!
//! Payments move money on their invoice: recording one adds its amount to
//! `paid_amount`, changing its amount applies the difference and deleting it
//! reverts it. Each adjustment runs under the invoice collection's write lock.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tokio::sync::Mutex;

use super::{local_today, new_id, StoreError};
use crate::mock_api::{ApiError, MockApi, Modify, Patch, TryModify};
use crate::models::{
    BillingStats, Invoice, InvoiceFilters, InvoiceStatus, InvoiceUpdate, Money, NewInvoice,
    NewPayment, Payment, PaymentUpdate,
};
use crate::rules;
use crate::store::{EntityState, EntityStore};
use crate::validation::{FieldError, ValidationErrors};

/// Size of the recent-payments list.
pub const RECENT_PAYMENTS_LIMIT: usize = 10;

pub type InvoiceState = EntityState<Invoice, InvoiceFilters>;
pub type PaymentState = EntityState<Payment, ()>;

pub struct BillingStore {
    invoices: EntityStore<Invoice, InvoiceFilters>,
    payments: EntityStore<Payment, ()>,
    /// Held from number allocation until the invoice is stored.
    numbering: Mutex<()>,
}

deref_entity_store!(BillingStore, invoices: Invoice, InvoiceFilters);

impl BillingStore {
    pub fn new(invoices: Arc<MockApi<Invoice>>, payments: Arc<MockApi<Payment>>) -> Self {
        Self {
            invoices: EntityStore::new(invoices),
            payments: EntityStore::new(payments),
            numbering: Mutex::new(()),
        }
    }

    pub fn payments(&self) -> &EntityStore<Payment, ()> {
        &self.payments
    }

    pub async fn load_invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        self.invoices.load().await
    }

    pub async fn load_payments(&self) -> Result<Vec<Payment>, StoreError> {
        self.payments.load().await
    }

    pub async fn get_invoice(&self, id: &str) -> Result<Invoice, StoreError> {
        self.invoices.get(id).await
    }

    pub async fn get_payment(&self, id: &str) -> Result<Payment, StoreError> {
        self.payments.get(id).await
    }

    // ── Invoices ────────────────────────────────────────────

    pub async fn create_invoice(&self, new: NewInvoice) -> Result<Invoice, StoreError> {
        new.validate()?;
        let _numbering = self.numbering.lock().await;
        let number = self.next_invoice_number(new.issue_date);
        let invoice = new.into_invoice(new_id(), number, Utc::now());
        self.invoices.insert(invoice).await
    }

    /// Replacing the items recomputes totals and the remaining amount.
    pub async fn update_invoice(
        &self,
        id: &str,
        update: InvoiceUpdate,
    ) -> Result<Invoice, StoreError> {
        self.invoices.patch(id, update).await
    }

    pub async fn set_invoice_status(
        &self,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<Invoice, StoreError> {
        self.update_invoice(id, InvoiceUpdate::status(status)).await
    }

    /// Payments referencing the invoice are left in place.
    pub async fn delete_invoice(&self, id: &str) -> Result<(), StoreError> {
        self.invoices.remove(id).await
    }

    /// Next `FTRyyyymmNNNN` number for the month of `issue_date`.
    pub fn next_invoice_number(&self, issue_date: NaiveDate) -> String {
        let prefix = format!("FTR{:04}{:02}", issue_date.year(), issue_date.month());
        let last = self
            .invoices
            .api()
            .snapshot()
            .iter()
            .filter_map(|i| i.invoice_number.strip_prefix(&prefix)?.parse::<usize>().ok())
            .max()
            .unwrap_or(0);
        rules::invoice_number(issue_date, last + 1)
    }

    // ── Payments ────────────────────────────────────────────

    /// Stores the payment and applies its amount to the invoice. Fails
    /// without side effects when the invoice does not exist.
    pub async fn create_payment(
        &self,
        new: NewPayment,
        received_by: &str,
    ) -> Result<Payment, StoreError> {
        new.validate()?;
        let payment = new.into_payment(new_id(), received_by.to_string(), Utc::now());
        let invoices = Arc::clone(self.invoices.api());
        let payments = Arc::clone(self.payments.api());

        let (created, invoice) = self
            .payments
            .run(
                "create",
                async move {
                    let amount = payment.amount;
                    let invoice_id = payment.invoice_id.clone();
                    let invoice = invoices.update(&invoice_id, settle(amount)).await?;
                    match payments.create(payment).await {
                        Ok(created) => Ok((created, invoice)),
                        Err(e) => {
                            invoices.update(&invoice_id, revert(amount)).await?;
                            Err(StoreError::from(e))
                        }
                    }
                },
                |s, (created, _): &(Payment, Invoice)| s.data.push(created.clone()),
            )
            .await?;

        self.invoices.apply_local(&invoice);
        tracing::info!(
            invoice = %invoice.invoice_number,
            amount = created.amount,
            status = %invoice.status,
            "payment recorded"
        );
        Ok(created)
    }

    pub async fn record_payment(
        &self,
        invoice_id: &str,
        mut new: NewPayment,
        received_by: &str,
    ) -> Result<Payment, StoreError> {
        new.invoice_id = invoice_id.to_string();
        self.create_payment(new, received_by).await
    }

    /// A changed amount moves the difference onto the invoice.
    pub async fn update_payment(
        &self,
        id: &str,
        update: PaymentUpdate,
    ) -> Result<Payment, StoreError> {
        if update.amount.is_some_and(|a| a <= 0) {
            return Err(non_positive_amount().into());
        }
        let invoices = Arc::clone(self.invoices.api());
        let payments = Arc::clone(self.payments.api());

        let (updated, invoice) = self
            .payments
            .run(
                "update",
                async move {
                    let mut previous = 0;
                    let updated = payments
                        .update(
                            id,
                            TryModify(|p: &mut Payment| {
                                previous = p.amount;
                                update.apply(p)
                            }),
                        )
                        .await?;
                    let delta = updated.amount - previous;
                    let invoice = if delta == 0 {
                        None
                    } else {
                        adjust_invoice(&invoices, &updated.invoice_id, settle(delta)).await?
                    };
                    Ok((updated, invoice))
                },
                |s, (updated, _): &(Payment, Option<Invoice>)| replace(&mut s.data, updated),
            )
            .await?;

        if let Some(invoice) = &invoice {
            self.invoices.apply_local(invoice);
        }
        Ok(updated)
    }

    /// Removes the payment and reverts its amount on the invoice.
    pub async fn delete_payment(&self, id: &str) -> Result<(), StoreError> {
        let invoices = Arc::clone(self.invoices.api());
        let payments = Arc::clone(self.payments.api());
        let owned = id.to_string();

        let invoice = self
            .payments
            .run(
                "delete",
                async move {
                    let payment = payments.get_by_id(id).await?;
                    payments.delete(id).await?;
                    adjust_invoice(&invoices, &payment.invoice_id, revert(payment.amount)).await
                },
                move |s, _| s.data.retain(|p| p.id != owned),
            )
            .await?;

        if let Some(invoice) = &invoice {
            self.invoices.apply_local(invoice);
        }
        Ok(())
    }

    // ── Derived views ───────────────────────────────────────

    pub fn filtered(&self) -> Vec<Invoice> {
        self.invoices.store().with(|s| {
            s.data
                .iter()
                .filter(|i| s.filters.matches(i))
                .cloned()
                .collect()
        })
    }

    pub fn payments_for_invoice(&self, invoice_id: &str) -> Vec<Payment> {
        self.payments.store().with(|s| {
            s.data
                .iter()
                .filter(|p| p.invoice_id == invoice_id)
                .cloned()
                .collect()
        })
    }

    /// The newest payments by payment date.
    pub fn recent_payments(&self) -> Vec<Payment> {
        let mut payments = self.payments.data();
        payments.sort_by_key(|p| Reverse(p.payment_date));
        payments.truncate(RECENT_PAYMENTS_LIMIT);
        payments
    }

    pub fn stats_on(&self, day: NaiveDate) -> BillingStats {
        let mut stats = self.invoices.store().with(|s| invoice_stats(&s.data));
        self.payments.store().with(|s| {
            for p in &s.data {
                let paid_on = p.payment_date.date_naive();
                if paid_on == day {
                    stats.todays_revenue += p.amount;
                    stats.todays_payments += 1;
                }
                if paid_on.year() == day.year() && paid_on.month() == day.month() {
                    stats.monthly_revenue += p.amount;
                    stats.monthly_payments += 1;
                }
            }
        });
        stats
    }

    pub fn stats(&self) -> BillingStats {
        self.stats_on(local_today())
    }
}

fn settle(amount: Money) -> Modify<impl FnOnce(&mut Invoice)> {
    Modify(move |invoice: &mut Invoice| rules::apply_payment(invoice, amount))
}

fn revert(amount: Money) -> Modify<impl FnOnce(&mut Invoice)> {
    Modify(move |invoice: &mut Invoice| rules::revert_payment(invoice, amount))
}

/// Applies a payment adjustment to the invoice. An invoice deleted in the
/// meantime is skipped.
async fn adjust_invoice(
    invoices: &MockApi<Invoice>,
    invoice_id: &str,
    adjustment: impl Patch<Invoice>,
) -> Result<Option<Invoice>, StoreError> {
    match invoices.update(invoice_id, adjustment).await {
        Ok(invoice) => Ok(Some(invoice)),
        Err(ApiError::NotFound { .. }) => {
            tracing::warn!(invoice_id, "payment adjustment skipped, invoice missing");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn invoice_stats(invoices: &[Invoice]) -> BillingStats {
    let mut stats = BillingStats {
        total_invoices: invoices.len(),
        ..BillingStats::default()
    };
    for i in invoices {
        match i.status {
            InvoiceStatus::Paid => {
                stats.paid_invoices += 1;
                stats.total_revenue += i.total;
            }
            InvoiceStatus::Pending => {
                stats.pending_invoices += 1;
                stats.pending_amount += i.remaining_amount;
            }
            InvoiceStatus::Overdue => {
                stats.overdue_invoices += 1;
                stats.overdue_amount += i.remaining_amount;
            }
            InvoiceStatus::Draft | InvoiceStatus::Cancelled => {}
        }
    }
    stats
}

fn replace(data: &mut [Payment], updated: &Payment) {
    if let Some(slot) = data.iter_mut().find(|p| p.id == updated.id) {
        *slot = updated.clone();
    }
}

fn non_positive_amount() -> ValidationErrors {
    ValidationErrors {
        errors: vec![FieldError {
            field: "amount".into(),
            message: "must be positive".into(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::{TimeZone, Utc};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn new_invoice(issue: NaiveDate, unit_price: Money) -> NewInvoice {
        NewInvoice {
            patient_id: "p1".into(),
            patient_name: Some("Ayşe Yılmaz".into()),
            appointment_id: None,
            issue_date: issue,
            due_date: None,
            status: InvoiceStatus::Pending,
            items: vec![NewInvoiceItem {
                description: "Muayene ücreti".into(),
                quantity: 1,
                unit_price,
                tax_rate: 0,
                service_code: None,
            }],
            notes: None,
        }
    }

    fn new_payment(invoice_id: &str, amount: Money) -> NewPayment {
        NewPayment {
            invoice_id: invoice_id.into(),
            payment_date: None,
            amount,
            method: PaymentMethod::Cash,
            reference_number: None,
            notes: None,
        }
    }

    fn empty_store() -> BillingStore {
        BillingStore::new(
            Arc::new(MockApi::instant(vec![])),
            Arc::new(MockApi::instant(vec![])),
        )
    }

    #[tokio::test]
    async fn invoice_numbers_run_per_month() {
        let store = empty_store();
        let a = store.create_invoice(new_invoice(day(3, 1), 100)).await.unwrap();
        let b = store.create_invoice(new_invoice(day(3, 20), 100)).await.unwrap();
        let c = store.create_invoice(new_invoice(day(4, 2), 100)).await.unwrap();
        assert_eq!(a.invoice_number, "FTR2024030001");
        assert_eq!(b.invoice_number, "FTR2024030002");
        assert_eq!(c.invoice_number, "FTR2024040001");

        store.delete_invoice(&a.id).await.unwrap();
        let d = store.create_invoice(new_invoice(day(3, 21), 100)).await.unwrap();
        assert_eq!(d.invoice_number, "FTR2024030003");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_invoices_get_distinct_numbers() {
        let delay = std::time::Duration::from_millis(20);
        let store = BillingStore::new(
            Arc::new(MockApi::with_delay(vec![], delay)),
            Arc::new(MockApi::with_delay(vec![], delay)),
        );

        let (a, b) = tokio::join!(
            store.create_invoice(new_invoice(day(3, 1), 100)),
            store.create_invoice(new_invoice(day(3, 2), 100)),
        );
        let mut numbers = vec![a.unwrap().invoice_number, b.unwrap().invoice_number];
        numbers.sort();
        assert_eq!(numbers, ["FTR2024030001", "FTR2024030002"]);
    }

    #[tokio::test]
    async fn invoice_number_widens_after_9999() {
        let last = new_invoice(day(3, 1), 100).into_invoice(
            "i-last".into(),
            "FTR2024039999".into(),
            Utc::now(),
        );
        let store = BillingStore::new(
            Arc::new(MockApi::instant(vec![last])),
            Arc::new(MockApi::instant(vec![])),
        );
        let next = store.create_invoice(new_invoice(day(3, 5), 100)).await.unwrap();
        assert_eq!(next.invoice_number, "FTR20240310000");
        assert_eq!(store.next_invoice_number(day(3, 6)), "FTR20240310001");
    }

    #[tokio::test]
    async fn payments_settle_the_invoice() {
        let store = empty_store();
        let inv = store.create_invoice(new_invoice(day(3, 1), 1_000)).await.unwrap();

        store.create_payment(new_payment(&inv.id, 400), "u1").await.unwrap();
        let partial = store.data()[0].clone();
        assert_eq!(partial.paid_amount, 400);
        assert_eq!(partial.remaining_amount, 600);
        assert_eq!(partial.status, InvoiceStatus::Pending);

        let last = store
            .record_payment(&inv.id, new_payment("ignored", 600), "u1")
            .await
            .unwrap();
        assert_eq!(last.invoice_id, inv.id);
        let settled = store.get_invoice(&inv.id).await.unwrap();
        assert_eq!(settled.status, InvoiceStatus::Paid);
        assert_eq!(settled.remaining_amount, 0);
        assert_eq!(store.data()[0], settled);
        assert_eq!(store.payments_for_invoice(&inv.id).len(), 2);
    }

    #[tokio::test]
    async fn payment_for_missing_invoice_has_no_effect() {
        let store = empty_store();
        let err = store
            .create_payment(new_payment("nope", 100), "u1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.payments().api().is_empty());
        assert!(store.payments().state().error.is_some());
    }

    #[tokio::test]
    async fn update_and_delete_payment_adjust_the_invoice() {
        let store = empty_store();
        let inv = store.create_invoice(new_invoice(day(3, 1), 1_000)).await.unwrap();
        let p = store.create_payment(new_payment(&inv.id, 1_000), "u1").await.unwrap();
        assert_eq!(store.data()[0].status, InvoiceStatus::Paid);

        store
            .update_payment(
                &p.id,
                PaymentUpdate {
                    amount: Some(700),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let after_update = store.data()[0].clone();
        assert_eq!(after_update.paid_amount, 700);
        assert_eq!(after_update.status, InvoiceStatus::Pending);

        store.delete_payment(&p.id).await.unwrap();
        let after_delete = store.get_invoice(&inv.id).await.unwrap();
        assert_eq!(after_delete.paid_amount, 0);
        assert_eq!(after_delete.remaining_amount, 1_000);
        assert_eq!(after_delete.status, InvoiceStatus::Pending);
        assert!(store.payments().data().is_empty());
    }

    #[tokio::test]
    async fn non_positive_payment_amounts_are_rejected() {
        let store = empty_store();
        let inv = store.create_invoice(new_invoice(day(3, 1), 1_000)).await.unwrap();
        let err = store
            .create_payment(new_payment(&inv.id, 0), "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let p = store.create_payment(new_payment(&inv.id, 10), "u1").await.unwrap();
        let err = store
            .update_payment(
                &p.id,
                PaymentUpdate {
                    amount: Some(-5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn stats_and_recent_payments() {
        let store = empty_store();
        let paid = store.create_invoice(new_invoice(day(3, 1), 1_000)).await.unwrap();
        let open = store.create_invoice(new_invoice(day(3, 2), 500)).await.unwrap();
        let late = store.create_invoice(new_invoice(day(2, 2), 300)).await.unwrap();
        store
            .set_invoice_status(&late.id, InvoiceStatus::Overdue)
            .await
            .unwrap();

        let mut full = new_payment(&paid.id, 1_000);
        full.payment_date = Some(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
        store.create_payment(full, "u1").await.unwrap();
        let mut part = new_payment(&open.id, 200);
        part.payment_date = Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());
        store.create_payment(part, "u1").await.unwrap();

        let stats = store.stats_on(day(3, 15));
        assert_eq!(stats.total_invoices, 3);
        assert_eq!(stats.paid_invoices, 1);
        assert_eq!(stats.total_revenue, 1_000);
        assert_eq!(stats.pending_invoices, 1);
        assert_eq!(stats.pending_amount, 300);
        assert_eq!(stats.overdue_invoices, 1);
        assert_eq!(stats.overdue_amount, 300);
        assert_eq!(stats.todays_payments, 1);
        assert_eq!(stats.todays_revenue, 200);
        assert_eq!(stats.monthly_payments, 2);
        assert_eq!(stats.monthly_revenue, 1_200);

        let recent = store.recent_payments();
        assert_eq!(recent[0].amount, 200);
        assert_eq!(recent[1].amount, 1_000);
    }

    #[tokio::test]
    async fn filtered_invoices_by_status_and_date() {
        let store = empty_store();
        store.create_invoice(new_invoice(day(3, 1), 100)).await.unwrap();
        store.create_invoice(new_invoice(day(4, 1), 100)).await.unwrap();
        store.update_filters(|f| f.date_from = Some(day(3, 15)));
        assert_eq!(store.filtered().len(), 1);
        store.update_filters(|f| f.status = Some(InvoiceStatus::Paid));
        assert!(store.filtered().is_empty());
    }
}
