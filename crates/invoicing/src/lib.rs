//! Invoicing domain module (event-sourced).
//!
//! This crate contains the invoice computation core: line-item and invoice
//! totals, locale-aware currency formatting and effective status derivation,
//! plus the invoice aggregate, list filters and revenue reporting built on
//! top of them. Everything here is deterministic domain logic (no IO, no
//! HTTP, no storage, no clock reads: "now" is always passed in).

pub mod calculation;
pub mod client;
pub mod company;
pub mod config;
pub mod currency;
pub mod filter;
pub mod invoice;
pub mod item;
pub mod report;
pub mod status;

pub use calculation::{compute_invoice_totals, compute_item, Totals};
pub use client::{Client, ClientDetails, ClientDraft, ClientId};
pub use company::{Company, CompanyDraft};
pub use config::InvoicingConfig;
pub use currency::{
    currency_symbol, format_currency, CurrencyCode, CurrencyFormatter, LocaleFormat,
    SymbolPosition,
};
pub use filter::{ClientQuery, InvoiceQuery};
pub use invoice::{
    ConfirmInvoice, CreateDraft, DeleteInvoice, DraftCreated, DraftRevised, DueDate, Invoice,
    InvoiceCommand, InvoiceConfirmed, InvoiceDeleted, InvoiceEvent, InvoiceId, InvoicePaid,
    ItemsReplaced, PayInvoice, PaymentMethod, ReplaceItems, ReviseDraft, MAX_ITEMS_PER_INVOICE,
};
pub use item::{validate_items, InvoiceItem, InvoiceItemDraft, MAX_ITEM_MAGNITUDE};
pub use report::{ClientRevenue, MonthlyRevenue, RevenueReport, StatusCounts};
pub use status::{derive_effective_status, CalendarDate, EffectiveStatus, InvoiceStatus};
