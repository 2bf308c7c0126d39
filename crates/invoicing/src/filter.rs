//! List filters for the invoices and clients tables.
//!
//! Every criterion is optional; an empty query matches everything. Text
//! criteria are case-insensitive substring matches, ranges are inclusive.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::client::{Client, ClientId};
use crate::invoice::Invoice;
use crate::item::non_blank;
use crate::status::{CalendarDate, EffectiveStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceQuery {
    pub status: Option<EffectiveStatus>,
    /// Inclusive lower bound on the due date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the due date.
    pub date_to: Option<NaiveDate>,
    /// Inclusive lower bound on the invoice total.
    pub price_min: Option<Decimal>,
    /// Inclusive upper bound on the invoice total.
    pub price_max: Option<Decimal>,
    pub client_id: Option<ClientId>,
    pub reference: Option<String>,
}

impl InvoiceQuery {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Set the reference filter; a blank value removes it.
    pub fn set_reference(&mut self, value: impl Into<String>) {
        self.reference = non_blank(value.into());
    }

    /// Whether `invoice` passes every criterion on day `today`.
    ///
    /// Deleted or never-created invoices never match. The status criterion is
    /// checked against the effective status, so `Overdue` can be filtered on.
    pub fn matches(&self, invoice: &Invoice, today: impl CalendarDate) -> bool {
        if !invoice.is_live() {
            return false;
        }
        if let Some(status) = self.status {
            if invoice.effective_status(today) != status {
                return false;
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(due) = invoice.due_date() else {
                return false;
            };
            if !in_range(due, self.date_from, self.date_to) {
                return false;
            }
        }
        if self.price_min.is_some() || self.price_max.is_some() {
            let total = invoice.totals().total();
            if !in_range(total, self.price_min, self.price_max) {
                return false;
            }
        }
        if let Some(client_id) = self.client_id {
            if invoice.client_id() != Some(client_id) {
                return false;
            }
        }
        if let Some(needle) = &self.reference {
            if !contains_ignore_case(invoice.reference(), needle) {
                return false;
            }
        }
        true
    }

    /// Keep the invoices that match, preserving order.
    pub fn apply<'a, I, D>(&'a self, invoices: I, today: D) -> impl Iterator<Item = &'a Invoice> + 'a
    where
        I: IntoIterator<Item = &'a Invoice>,
        I::IntoIter: 'a,
        D: CalendarDate + Copy + 'a,
    {
        invoices
            .into_iter()
            .filter(move |invoice| self.matches(invoice, today))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub vat_number: Option<String>,
    /// Inclusive lower bound on the creation date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the creation date.
    pub date_to: Option<NaiveDate>,
}

impl ClientQuery {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.name = non_blank(value.into());
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.email = non_blank(value.into());
    }

    pub fn set_phone(&mut self, value: impl Into<String>) {
        self.phone = non_blank(value.into());
    }

    pub fn set_vat_number(&mut self, value: impl Into<String>) {
        self.vat_number = non_blank(value.into());
    }

    /// Removed clients never match.
    pub fn matches(&self, client: &Client) -> bool {
        if client.is_removed() {
            return false;
        }
        let details = client.details();
        let text_criteria = [
            (&self.name, Some(details.name.as_str())),
            (&self.email, details.email.as_deref()),
            (&self.phone, details.phone.as_deref()),
            (&self.vat_number, details.vat_number.as_deref()),
        ];
        for (needle, haystack) in text_criteria {
            if let Some(needle) = needle {
                if !contains_ignore_case(haystack, needle) {
                    return false;
                }
            }
        }
        in_range(client.created_at().calendar_date(), self.date_from, self.date_to)
    }

    pub fn apply<'a, I>(&'a self, clients: I) -> impl Iterator<Item = &'a Client> + 'a
    where
        I: IntoIterator<Item = &'a Client>,
        I::IntoIter: 'a,
    {
        clients.into_iter().filter(move |client| self.matches(client))
    }
}

fn in_range<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|haystack| haystack.to_lowercase().contains(&needle.to_lowercase()))
}
