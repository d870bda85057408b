//! Domain rules shared by the stores: invoice arithmetic, payment status
//! transitions, stock movement accounting and small derivations.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::models::{
    Invoice, InvoiceItem, InvoiceStatus, InventoryItem, ItemStatus, Money, NewInvoiceItem,
    StockMovementType,
};

/// Days ahead of expiry at which an item starts raising alerts.
pub const EXPIRY_WARNING_DAYS: i64 = 60;

// ═══════════════════════════════════════════════════════════
// Billing
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax_total: Money,
    pub total: Money,
}

/// `subtotal * rate / 100`, rounded half away from zero to the nearest kuruş.
pub fn tax_amount(subtotal: Money, rate: u8) -> Money {
    let scaled = subtotal * Money::from(rate);
    let half = if scaled >= 0 { 50 } else { -50 };
    (scaled + half) / 100
}

pub fn line_item(id: String, item: NewInvoiceItem) -> InvoiceItem {
    let subtotal = Money::from(item.quantity) * item.unit_price;
    let tax = tax_amount(subtotal, item.tax_rate);
    InvoiceItem {
        id,
        description: item.description,
        quantity: item.quantity,
        unit_price: item.unit_price,
        tax_rate: item.tax_rate,
        tax_amount: tax,
        total: subtotal + tax,
        service_code: item.service_code,
    }
}

pub fn invoice_totals(items: &[InvoiceItem]) -> InvoiceTotals {
    let subtotal: Money = items
        .iter()
        .map(|i| Money::from(i.quantity) * i.unit_price)
        .sum();
    let tax_total: Money = items.iter().map(|i| i.tax_amount).sum();
    InvoiceTotals {
        subtotal,
        tax_total,
        total: subtotal + tax_total,
    }
}

/// Status after the paid amount changed: nothing left to pay is `Paid`,
/// a partial payment is `Pending`. Cancelled invoices stay cancelled and an
/// unpaid invoice keeps its status.
pub fn settle_status(current: InvoiceStatus, paid: Money, remaining: Money) -> InvoiceStatus {
    if current == InvoiceStatus::Cancelled {
        current
    } else if remaining <= 0 {
        InvoiceStatus::Paid
    } else if paid > 0 {
        InvoiceStatus::Pending
    } else if current == InvoiceStatus::Paid {
        InvoiceStatus::Pending
    } else {
        current
    }
}

pub fn apply_payment(invoice: &mut Invoice, amount: Money) {
    invoice.paid_amount += amount;
    invoice.remaining_amount = invoice.total - invoice.paid_amount;
    invoice.status = settle_status(invoice.status, invoice.paid_amount, invoice.remaining_amount);
}

pub fn revert_payment(invoice: &mut Invoice, amount: Money) {
    apply_payment(invoice, -amount);
}

/// `FTR{yyyy}{mm}{NNNN}` where NNNN is the 1-based sequence within the month,
/// zero-padded to at least four digits. Past 9999 the field widens.
pub fn invoice_number(issue_date: NaiveDate, sequence: usize) -> String {
    format!(
        "FTR{:04}{:02}{:04}",
        issue_date.year(),
        issue_date.month(),
        sequence
    )
}

// ═══════════════════════════════════════════════════════════
// Inventory
// ═══════════════════════════════════════════════════════════

/// Signed stock change: purchases, returns and adjustments add; usage and
/// disposal subtract.
pub fn stock_delta(kind: StockMovementType, quantity: u32) -> i64 {
    let quantity = i64::from(quantity);
    match kind {
        StockMovementType::Purchase | StockMovementType::Return | StockMovementType::Adjustment => {
            quantity
        }
        StockMovementType::Usage | StockMovementType::Disposal => -quantity,
    }
}

/// Expired wins over stock levels; then out-of-stock at zero, low-stock at
/// or under the minimum, in-stock otherwise.
pub fn determine_item_status(
    current_stock: u32,
    min_stock_level: u32,
    expiry_date: Option<NaiveDate>,
    today: NaiveDate,
) -> ItemStatus {
    if expiry_date.is_some_and(|d| d < today) {
        ItemStatus::Expired
    } else if current_stock == 0 {
        ItemStatus::OutOfStock
    } else if current_stock <= min_stock_level {
        ItemStatus::LowStock
    } else {
        ItemStatus::InStock
    }
}

pub fn recommended_order_quantity(item: &InventoryItem) -> u32 {
    item.max_stock_level
        .saturating_sub(item.current_stock)
        .max(item.min_stock_level.saturating_mul(2))
}

pub fn is_expiring_soon(expiry_date: NaiveDate, today: NaiveDate) -> bool {
    expiry_date >= today && (expiry_date - today).num_days() <= EXPIRY_WARNING_DAYS
}

// ═══════════════════════════════════════════════════════════
// Appointments and people
// ═══════════════════════════════════════════════════════════

/// Clock time `duration_minutes` after `start`, wrapping past midnight.
pub fn appointment_end_time(start: NaiveTime, duration_minutes: u32) -> NaiveTime {
    let (end, _) =
        start.overflowing_add_signed(chrono::Duration::minutes(i64::from(duration_minutes)));
    end
}

/// Completed years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}
