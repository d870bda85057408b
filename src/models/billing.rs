use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{InvoiceStatus, PaymentMethod};
use crate::mock_api::{ApiError, Patch};
use crate::rules;

/// Amounts are integer minor units (kuruş).
pub type Money = i64;

/// VAT rates accepted on an invoice line, in percent.
pub const TAX_RATES: [u8; 4] = [0, 1, 8, 18];

pub const DEFAULT_TAX_RATE: u8 = 8;

/// Days between issue and due date when a caller does not pick one.
pub const DEFAULT_PAYMENT_TERM_DAYS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub tax_rate: u8,
    pub tax_amount: Money,
    /// Line subtotal plus tax.
    pub total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: u8,
    #[serde(default)]
    pub service_code: Option<String>,
}

fn default_tax_rate() -> u8 {
    DEFAULT_TAX_RATE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Money,
    pub tax_total: Money,
    pub total: Money,
    pub paid_amount: Money,
    /// Always `total - paid_amount`.
    pub remaining_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(Invoice, "Invoice");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_invoice_status")]
    pub status: InvoiceStatus,
    pub items: Vec<NewInvoiceItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_invoice_status() -> InvoiceStatus {
    InvoiceStatus::Pending
}

impl NewInvoice {
    pub fn into_invoice(self, id: String, invoice_number: String, now: DateTime<Utc>) -> Invoice {
        let items = build_items(self.items);
        let totals = rules::invoice_totals(&items);
        Invoice {
            id,
            invoice_number,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            appointment_id: self.appointment_id,
            issue_date: self.issue_date,
            due_date: self.due_date.unwrap_or_else(|| {
                self.issue_date + chrono::Duration::days(DEFAULT_PAYMENT_TERM_DAYS)
            }),
            status: self.status,
            items,
            subtotal: totals.subtotal,
            tax_total: totals.tax_total,
            total: totals.total,
            paid_amount: 0,
            remaining_amount: totals.total,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

fn build_items(items: Vec<NewInvoiceItem>) -> Vec<InvoiceItem> {
    items
        .into_iter()
        .map(|item| rules::line_item(Uuid::new_v4().to_string(), item))
        .collect()
}

/// Partial invoice edit. Replacing `items` recomputes every total and
/// settles the status against the new remainder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceUpdate {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub appointment_id: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    pub items: Option<Vec<NewInvoiceItem>>,
    pub notes: Option<String>,
}

impl InvoiceUpdate {
    pub fn status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Patch<Invoice> for InvoiceUpdate {
    fn apply(self, invoice: &mut Invoice) -> Result<(), ApiError> {
        let mut src = self;
        let new_items = src.items.take();
        merge_fields!(src => invoice;
            patient_id, issue_date, due_date, status;
            optional patient_name, appointment_id, notes);
        if let Some(items) = new_items {
            invoice.items = build_items(items);
            let totals = rules::invoice_totals(&invoice.items);
            invoice.subtotal = totals.subtotal;
            invoice.tax_total = totals.tax_total;
            invoice.total = totals.total;
            invoice.remaining_amount = totals.total - invoice.paid_amount;
            invoice.status = rules::settle_status(
                invoice.status,
                invoice.paid_amount,
                invoice.remaining_amount,
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub payment_date: DateTime<Utc>,
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub received_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(Payment, "Payment");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub invoice_id: String,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn into_payment(self, id: String, received_by: String, now: DateTime<Utc>) -> Payment {
        Payment {
            id,
            invoice_id: self.invoice_id,
            payment_date: self.payment_date.unwrap_or(now),
            amount: self.amount,
            method: self.method,
            reference_number: self.reference_number,
            notes: self.notes,
            received_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentUpdate {
    pub payment_date: Option<DateTime<Utc>>,
    pub amount: Option<Money>,
    pub method: Option<PaymentMethod>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

impl Patch<Payment> for PaymentUpdate {
    fn apply(self, payment: &mut Payment) -> Result<(), ApiError> {
        let src = self;
        merge_fields!(src => payment;
            payment_date, amount, method;
            optional reference_number, notes);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFilters {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl InvoiceFilters {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.map_or(true, |s| invoice.status == s)
            && self
                .patient_id
                .as_ref()
                .map_or(true, |p| &invoice.patient_id == p)
            && self.date_from.map_or(true, |from| invoice.issue_date >= from)
            && self.date_to.map_or(true, |to| invoice.issue_date <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingStats {
    pub total_invoices: usize,
    pub paid_invoices: usize,
    pub pending_invoices: usize,
    pub overdue_invoices: usize,
    /// Sum of `total` over paid invoices.
    pub total_revenue: Money,
    pub pending_amount: Money,
    pub overdue_amount: Money,
    pub todays_revenue: Money,
    pub todays_payments: usize,
    pub monthly_revenue: Money,
    pub monthly_payments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: u32, price: Money, rate: u8) -> NewInvoiceItem {
        NewInvoiceItem {
            description: "Dahiliye Muayenesi".into(),
            quantity: qty,
            unit_price: price,
            tax_rate: rate,
            service_code: Some("MYN-001".into()),
        }
    }

    fn sample() -> Invoice {
        NewInvoice {
            patient_id: "p1".into(),
            patient_name: None,
            appointment_id: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            due_date: None,
            status: InvoiceStatus::Pending,
            items: vec![item(1, 35_000, 1), item(2, 4_500, 8)],
            notes: None,
        }
        .into_invoice("i1".into(), "FTR2024050001".into(), Utc::now())
    }

    #[test]
    fn new_invoice_computes_totals_and_due_date() {
        let inv = sample();
        assert_eq!(inv.subtotal, 44_000);
        assert_eq!(inv.tax_total, 350 + 720);
        assert_eq!(inv.total, 45_070);
        assert_eq!(inv.remaining_amount, inv.total);
        assert_eq!(inv.due_date, NaiveDate::from_ymd_opt(2024, 5, 25).unwrap());
        assert_eq!(inv.items.len(), 2);
        assert_ne!(inv.items[0].id, inv.items[1].id);
    }

    #[test]
    fn replacing_items_keeps_paid_amount() {
        let mut inv = sample();
        inv.paid_amount = 10_000;
        InvoiceUpdate {
            items: Some(vec![item(1, 20_000, 0)]),
            ..Default::default()
        }
        .apply(&mut inv)
        .unwrap();
        assert_eq!(inv.total, 20_000);
        assert_eq!(inv.paid_amount, 10_000);
        assert_eq!(inv.remaining_amount, 10_000);
    }

    #[test]
    fn replacing_items_settles_status() {
        let mut inv = sample();
        inv.paid_amount = 20_000;
        InvoiceUpdate {
            items: Some(vec![item(1, 20_000, 0)]),
            ..Default::default()
        }
        .apply(&mut inv)
        .unwrap();
        assert_eq!(inv.remaining_amount, 0);
        assert_eq!(inv.status, InvoiceStatus::Paid);

        InvoiceUpdate {
            items: Some(vec![item(1, 30_000, 0)]),
            ..Default::default()
        }
        .apply(&mut inv)
        .unwrap();
        assert_eq!(inv.remaining_amount, 10_000);
        assert_eq!(inv.status, InvoiceStatus::Pending);

        inv.status = InvoiceStatus::Cancelled;
        InvoiceUpdate {
            items: Some(vec![item(1, 5_000, 0)]),
            ..Default::default()
        }
        .apply(&mut inv)
        .unwrap();
        assert_eq!(inv.status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn status_only_update_leaves_totals() {
        let mut inv = sample();
        let total = inv.total;
        InvoiceUpdate::status(InvoiceStatus::Overdue)
            .apply(&mut inv)
            .unwrap();
        assert_eq!(inv.status, InvoiceStatus::Overdue);
        assert_eq!(inv.total, total);
    }

    #[test]
    fn new_item_defaults_to_eight_percent() {
        let parsed: NewInvoiceItem =
            serde_json::from_str(r#"{"description":"EKG","quantity":1,"unit_price":10000}"#)
                .unwrap();
        assert_eq!(parsed.tax_rate, 8);
    }
}
