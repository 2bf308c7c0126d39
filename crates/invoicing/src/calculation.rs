//! Line-item and invoice-level financial computation.
//!
//! All arithmetic is exact decimal arithmetic. Nothing here rounds: rounding to
//! currency precision happens only when an amount is formatted for display.
//!
//! A single item cannot overflow (`InvoiceItem` caps quantity and price at
//! [`MAX_ITEM_MAGNITUDE`](crate::item::MAX_ITEM_MAGNITUDE)). Sums of very many
//! large items saturate at `Decimal::MAX` instead of panicking; invoices are
//! capped at [`MAX_ITEMS_PER_INVOICE`](crate::invoice::MAX_ITEMS_PER_INVOICE)
//! lines, far below that point.

use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billdesk_core::ValueObject;

use crate::item::InvoiceItem;

/// Subtotal, tax and total of one item or of a whole invoice.
///
/// Invariant: `total == subtotal + tax`. Deserialization recomputes `total`
/// from the other two figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TotalsParts")]
pub struct Totals {
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

#[derive(Deserialize)]
struct TotalsParts {
    subtotal: Decimal,
    tax: Decimal,
}

impl From<TotalsParts> for Totals {
    fn from(parts: TotalsParts) -> Self {
        Totals::from_parts(parts.subtotal, parts.tax)
    }
}

impl ValueObject for Totals {}

impl Totals {
    pub const ZERO: Totals = Totals {
        subtotal: Decimal::ZERO,
        tax: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    pub fn from_parts(subtotal: Decimal, tax: Decimal) -> Self {
        Self {
            subtotal,
            tax,
            total: subtotal.saturating_add(tax),
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals::from_parts(
            self.subtotal.saturating_add(rhs.subtotal),
            self.tax.saturating_add(rhs.tax),
        )
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Self {
        iter.fold(Totals::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Totals> for Totals {
    fn sum<I: Iterator<Item = &'a Totals>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Compute one item's figures:
///
/// - `subtotal = quantity × unit_price`
/// - `tax = subtotal × tax_rate_percent / 100`
/// - `total = subtotal + tax`
pub fn compute_item(item: &InvoiceItem) -> Totals {
    let subtotal = item.quantity() * item.unit_price();
    let tax = subtotal * (item.tax_rate_percent() / Decimal::ONE_HUNDRED);
    Totals::from_parts(subtotal, tax)
}

/// Sum item figures into invoice figures. An empty sequence yields
/// [`Totals::ZERO`]; item order never affects the result.
pub fn compute_invoice_totals<'a, I>(items: I) -> Totals
where
    I: IntoIterator<Item = &'a InvoiceItem>,
{
    items.into_iter().map(compute_item).sum()
}
