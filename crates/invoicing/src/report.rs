//! Revenue reporting for the dashboard overview.
//!
//! Amounts are summed as-is: the report assumes the invoices it is given
//! share one currency. Callers with mixed currencies build one report per
//! currency.

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::invoice::Invoice;
use crate::status::{CalendarDate, EffectiveStatus};

/// Number of live invoices per effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub pending: usize,
    pub overdue: usize,
    pub paid: usize,
}

impl StatusCounts {
    fn record(&mut self, status: EffectiveStatus) {
        match status {
            EffectiveStatus::Draft => self.draft += 1,
            EffectiveStatus::Pending => self.pending += 1,
            EffectiveStatus::Overdue => self.overdue += 1,
            EffectiveStatus::Paid => self.paid += 1,
        }
    }

    /// Drafts plus invoices awaiting payment.
    pub fn unpaid(&self) -> usize {
        self.draft + self.pending + self.overdue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub year: i32,
    /// 1 = January.
    pub month: u32,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRevenue {
    pub client_id: ClientId,
    pub total_revenue: Decimal,
    pub invoice_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    /// Sum of paid invoice totals.
    pub total_revenue: Decimal,
    /// Sum of pending and overdue invoice totals.
    pub outstanding_amount: Decimal,
    pub invoice_counts: StatusCounts,
    /// Always twelve entries, January first; months without revenue are zero.
    pub monthly_revenue: Vec<MonthlyRevenue>,
    /// Paid revenue per client, highest first.
    pub top_clients: Vec<ClientRevenue>,
}

impl RevenueReport {
    /// Build the report for `year` as seen on day `today`.
    ///
    /// Paid invoices count toward the month they were emitted in. Only the
    /// `top_clients` best clients are kept (ties broken by client id).
    pub fn build<'a, I, D>(invoices: I, year: i32, today: D, top_clients: usize) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
        D: CalendarDate + Copy,
    {
        let mut total_revenue = Decimal::ZERO;
        let mut outstanding_amount = Decimal::ZERO;
        let mut invoice_counts = StatusCounts::default();
        let mut months = [Decimal::ZERO; 12];
        let mut per_client: BTreeMap<ClientId, (Decimal, usize)> = BTreeMap::new();

        for invoice in invoices.into_iter().filter(|invoice| invoice.is_live()) {
            let status = invoice.effective_status(today);
            invoice_counts.record(status);

            let total = invoice.totals().total();
            if status.is_outstanding() {
                outstanding_amount = outstanding_amount.saturating_add(total);
            }
            if status != EffectiveStatus::Paid {
                continue;
            }

            total_revenue = total_revenue.saturating_add(total);
            if let Some(emitted) = invoice.emission_date() {
                if emitted.year() == year {
                    let bucket = &mut months[emitted.month0() as usize];
                    *bucket = bucket.saturating_add(total);
                }
            }
            if let Some(client_id) = invoice.client_id() {
                let entry = per_client.entry(client_id).or_insert((Decimal::ZERO, 0));
                entry.0 = entry.0.saturating_add(total);
                entry.1 += 1;
            }
        }

        let monthly_revenue = months
            .iter()
            .zip(1u32..)
            .map(|(revenue, month)| MonthlyRevenue {
                year,
                month,
                revenue: *revenue,
            })
            .collect();

        let mut ranked: Vec<ClientRevenue> = per_client
            .into_iter()
            .map(|(client_id, (total_revenue, invoice_count))| ClientRevenue {
                client_id,
                total_revenue,
                invoice_count,
            })
            .collect();
        // Stable sort keeps the BTreeMap's client-id order among equal revenues.
        ranked.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
        ranked.truncate(top_clients);

        tracing::debug!(
            year,
            paid = invoice_counts.paid,
            outstanding = %outstanding_amount,
            "revenue report built"
        );

        Self {
            total_revenue,
            outstanding_amount,
            invoice_counts,
            monthly_revenue,
            top_clients: ranked,
        }
    }
}
