//! Invoice money derivation.
//!
//! Everything here is a pure function of the line items and discount fields.
//! Values are plain `f64` with no rounding; presentation formats currency.

use crate::models::{DiscountType, Invoice, LineItem};

/// Item sums produced by [`calculate_line_items`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineItemTotals {
    pub subtotal: f64,
    pub tax_total: f64,
}

/// Fully resolved money fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount_amount: f64,
    pub total: f64,
    pub amount_due: f64,
}

/// Fill `amount` and `tax_amount` on every item, in place and in order, and
/// return the sums.
pub fn calculate_line_items(items: &mut [LineItem]) -> LineItemTotals {
    let mut totals = LineItemTotals {
        subtotal: 0.0,
        tax_total: 0.0,
    };

    for item in items.iter_mut() {
        item.amount = item.quantity * item.rate;
        item.tax_amount = item.amount * item.tax_rate / 100.0;
        totals.subtotal += item.amount;
        totals.tax_total += item.tax_amount;
    }

    totals
}

/// Resolve discount, total and amount due.
///
/// A fixed discount is not clamped to the subtotal, so the total may be
/// negative.
pub fn resolve_totals(
    items: LineItemTotals,
    discount_type: DiscountType,
    discount_value: f64,
    amount_paid: f64,
) -> InvoiceTotals {
    let discount_amount = match discount_type {
        DiscountType::Percentage => items.subtotal * discount_value / 100.0,
        DiscountType::Fixed => discount_value,
    };
    let total = items.subtotal + items.tax_total - discount_amount;

    InvoiceTotals {
        subtotal: items.subtotal,
        tax_total: items.tax_total,
        discount_amount,
        total,
        amount_due: total - amount_paid,
    }
}

/// Re-derive every computed money field of `invoice` from its line items and
/// discount. Called before each persist.
pub fn apply_totals(invoice: &mut Invoice) {
    let items = calculate_line_items(&mut invoice.line_items);
    let totals = resolve_totals(
        items,
        invoice.discount_type,
        invoice.discount_value,
        invoice.amount_paid,
    );

    invoice.subtotal = totals.subtotal;
    invoice.tax_total = totals.tax_total;
    invoice.discount_amount = totals.discount_amount;
    invoice.total = totals.total;
    invoice.amount_due = totals.amount_due;
}
