use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billdesk_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, Event};

use crate::calculation::{compute_invoice_totals, Totals};
use crate::client::ClientId;
use crate::currency::{format_currency, CurrencyCode};
use crate::item::{non_blank, InvoiceItem};
use crate::status::{derive_effective_status, CalendarDate, EffectiveStatus, InvoiceStatus};

/// Upper bound on the number of lines a single invoice may carry.
pub const MAX_ITEMS_PER_INVOICE: usize = 1_000;

/// Invoice identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    BankTransfer,
    Cash,
    CreditCard,
    Paypal,
    Other,
}

/// How the due date of a new draft is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DueDate {
    /// A fixed calendar day.
    On(NaiveDate),
    /// A number of days after the emission date.
    InDays(u32),
}

impl DueDate {
    pub fn resolve(self, emission_date: NaiveDate) -> Result<NaiveDate, DomainError> {
        let due = match self {
            DueDate::On(date) => date,
            DueDate::InDays(days) => emission_date
                .checked_add_days(Days::new(u64::from(days)))
                .ok_or_else(|| DomainError::validation("due date is out of range"))?,
        };
        if due < emission_date {
            return Err(DomainError::validation(
                "due date must not be before the emission date",
            ));
        }
        Ok(due)
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    company_id: Option<CompanyId>,
    client_id: Option<ClientId>,
    series: String,
    number: Option<String>,
    reference: Option<String>,
    description: Option<String>,
    status: InvoiceStatus,
    currency: Option<CurrencyCode>,
    emission_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    items: Vec<InvoiceItem>,
    payment_method: Option<PaymentMethod>,
    paid_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            company_id: None,
            client_id: None,
            series: String::new(),
            number: None,
            reference: None,
            description: None,
            status: InvoiceStatus::Draft,
            currency: None,
            emission_date: None,
            due_date: None,
            items: Vec::new(),
            payment_method: None,
            paid_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    /// Rebuild an invoice from its event history.
    pub fn from_events<'a, I>(id: InvoiceId, events: I) -> Self
    where
        I: IntoIterator<Item = &'a InvoiceEvent>,
    {
        let mut invoice = Self::empty(id);
        for event in events {
            invoice.apply(event);
        }
        invoice
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    /// Sequential number, assigned by the backend on confirmation.
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    /// `SERIES-NUMBER`, once the invoice has been confirmed.
    pub fn display_number(&self) -> Option<String> {
        self.number
            .as_ref()
            .map(|number| format!("{}-{}", self.series, number))
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn emission_date(&self) -> Option<NaiveDate> {
        self.emission_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    /// Created and not deleted.
    pub fn is_live(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Invariant helper: only drafts can be edited or deleted.
    pub fn is_modifiable(&self) -> bool {
        self.is_live() && self.status == InvoiceStatus::Draft
    }

    pub fn totals(&self) -> Totals {
        compute_invoice_totals(&self.items)
    }

    /// Status shown to users on the given day.
    pub fn effective_status(&self, now: impl CalendarDate) -> EffectiveStatus {
        match self.due_date {
            Some(due) => derive_effective_status(self.status, due, now),
            None => self.status.into(),
        }
    }

    /// Invoice total formatted in the invoice currency for `locale`.
    pub fn formatted_total(&self, locale: &str) -> String {
        let code = self.currency.as_ref().map(CurrencyCode::as_str).unwrap_or("");
        format_currency(self.totals().total(), code, locale)
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateDraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDraft {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub client_id: ClientId,
    pub series: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub currency: CurrencyCode,
    pub emission_date: NaiveDate,
    pub due: DueDate,
    pub items: Vec<InvoiceItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReviseDraft. `None` leaves a field unchanged; an empty
/// `reference`/`description` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseDraft {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub client_id: Option<ClientId>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub currency: Option<CurrencyCode>,
    pub emission_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceItems (add, edit and remove lines in one step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceItems {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub items: Vec<InvoiceItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmInvoice. The number is assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PayInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub payment_method: Option<PaymentMethod>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateDraft(CreateDraft),
    ReviseDraft(ReviseDraft),
    ReplaceItems(ReplaceItems),
    ConfirmInvoice(ConfirmInvoice),
    PayInvoice(PayInvoice),
    DeleteInvoice(DeleteInvoice),
}

impl InvoiceCommand {
    fn name(&self) -> &'static str {
        match self {
            InvoiceCommand::CreateDraft(_) => "create_draft",
            InvoiceCommand::ReviseDraft(_) => "revise_draft",
            InvoiceCommand::ReplaceItems(_) => "replace_items",
            InvoiceCommand::ConfirmInvoice(_) => "confirm",
            InvoiceCommand::PayInvoice(_) => "pay",
            InvoiceCommand::DeleteInvoice(_) => "delete",
        }
    }
}

/// Event: DraftCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCreated {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub client_id: ClientId,
    pub series: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub currency: CurrencyCode,
    pub emission_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<InvoiceItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DraftRevised. Carries the full resulting header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRevised {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub client_id: ClientId,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub currency: CurrencyCode,
    pub emission_date: NaiveDate,
    pub due_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemsReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsReplaced {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub items: Vec<InvoiceItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceConfirmed {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub payment_method: Option<PaymentMethod>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDeleted {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    DraftCreated(DraftCreated),
    DraftRevised(DraftRevised),
    ItemsReplaced(ItemsReplaced),
    InvoiceConfirmed(InvoiceConfirmed),
    InvoicePaid(InvoicePaid),
    InvoiceDeleted(InvoiceDeleted),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::DraftCreated(_) => "invoicing.invoice.draft_created",
            InvoiceEvent::DraftRevised(_) => "invoicing.invoice.draft_revised",
            InvoiceEvent::ItemsReplaced(_) => "invoicing.invoice.items_replaced",
            InvoiceEvent::InvoiceConfirmed(_) => "invoicing.invoice.confirmed",
            InvoiceEvent::InvoicePaid(_) => "invoicing.invoice.paid",
            InvoiceEvent::InvoiceDeleted(_) => "invoicing.invoice.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::DraftCreated(e) => e.occurred_at,
            InvoiceEvent::DraftRevised(e) => e.occurred_at,
            InvoiceEvent::ItemsReplaced(e) => e.occurred_at,
            InvoiceEvent::InvoiceConfirmed(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::InvoiceDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::DraftCreated(e) => {
                self.id = e.invoice_id;
                self.company_id = Some(e.company_id);
                self.client_id = Some(e.client_id);
                self.series = e.series.clone();
                self.reference = e.reference.clone();
                self.description = e.description.clone();
                self.currency = Some(e.currency.clone());
                self.emission_date = Some(e.emission_date);
                self.due_date = Some(e.due_date);
                self.items = e.items.clone();
                self.status = InvoiceStatus::Draft;
                self.created = true;
            }
            InvoiceEvent::DraftRevised(e) => {
                self.client_id = Some(e.client_id);
                self.reference = e.reference.clone();
                self.description = e.description.clone();
                self.currency = Some(e.currency.clone());
                self.emission_date = Some(e.emission_date);
                self.due_date = Some(e.due_date);
            }
            InvoiceEvent::ItemsReplaced(e) => {
                self.items = e.items.clone();
            }
            InvoiceEvent::InvoiceConfirmed(e) => {
                self.number = Some(e.number.clone());
                self.status = InvoiceStatus::Pending;
            }
            InvoiceEvent::InvoicePaid(e) => {
                self.payment_method = e.payment_method;
                self.paid_at = Some(e.occurred_at);
                self.status = InvoiceStatus::Paid;
            }
            InvoiceEvent::InvoiceDeleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let result = match command {
            InvoiceCommand::CreateDraft(cmd) => self.handle_create(cmd),
            InvoiceCommand::ReviseDraft(cmd) => self.handle_revise(cmd),
            InvoiceCommand::ReplaceItems(cmd) => self.handle_replace_items(cmd),
            InvoiceCommand::ConfirmInvoice(cmd) => self.handle_confirm(cmd),
            InvoiceCommand::PayInvoice(cmd) => self.handle_pay(cmd),
            InvoiceCommand::DeleteInvoice(cmd) => self.handle_delete(cmd),
        };

        match &result {
            Ok(events) => tracing::debug!(
                invoice_id = %self.id,
                command = command.name(),
                events = events.len(),
                "invoice command accepted"
            ),
            Err(err) => tracing::debug!(
                invoice_id = %self.id,
                command = command.name(),
                error = %err,
                "invoice command rejected"
            ),
        }
        result
    }
}

impl Invoice {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    /// Common guard for commands on an existing invoice.
    fn ensure_target(&self, company_id: CompanyId, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if !self.is_live() {
            return Err(DomainError::not_found());
        }
        self.ensure_company(company_id)?;
        self.ensure_invoice_id(invoice_id)
    }

    fn ensure_draft(&self, action: &str) -> Result<(), DomainError> {
        match self.status {
            InvoiceStatus::Draft => Ok(()),
            InvoiceStatus::Pending => Err(DomainError::invariant(format!(
                "cannot {action}: only draft invoices can be modified"
            ))),
            InvoiceStatus::Paid => Err(DomainError::invariant(format!(
                "cannot {action}: paid invoices are immutable"
            ))),
        }
    }

    fn ensure_items(items: &[InvoiceItem]) -> Result<(), DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation(
                "invoice must have at least one item",
            ));
        }
        if items.len() > MAX_ITEMS_PER_INVOICE {
            return Err(DomainError::validation(format!(
                "invoice must not have more than {MAX_ITEMS_PER_INVOICE} items"
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateDraft) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        self.ensure_invoice_id(cmd.invoice_id)?;

        let series = cmd.series.trim();
        if series.is_empty() {
            return Err(DomainError::validation("invoice series must not be blank"));
        }
        Self::ensure_items(&cmd.items)?;
        let due_date = cmd.due.resolve(cmd.emission_date)?;

        Ok(vec![InvoiceEvent::DraftCreated(DraftCreated {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            client_id: cmd.client_id,
            series: series.to_string(),
            reference: cmd.reference.clone().and_then(non_blank),
            description: cmd.description.clone().and_then(non_blank),
            currency: cmd.currency.clone(),
            emission_date: cmd.emission_date,
            due_date,
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseDraft) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft("revise invoice")?;

        let (Some(client_id), Some(currency), Some(emission_date), Some(due_date)) = (
            cmd.client_id.or(self.client_id),
            cmd.currency.clone().or_else(|| self.currency.clone()),
            cmd.emission_date.or(self.emission_date),
            cmd.due_date.or(self.due_date),
        ) else {
            return Err(DomainError::invariant("draft is missing header fields"));
        };
        if due_date < emission_date {
            return Err(DomainError::validation(
                "due date must not be before the emission date",
            ));
        }

        let reference = match &cmd.reference {
            Some(value) => non_blank(value.clone()),
            None => self.reference.clone(),
        };
        let description = match &cmd.description {
            Some(value) => non_blank(value.clone()),
            None => self.description.clone(),
        };

        Ok(vec![InvoiceEvent::DraftRevised(DraftRevised {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            client_id,
            reference,
            description,
            currency,
            emission_date,
            due_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_items(&self, cmd: &ReplaceItems) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft("edit items")?;
        Self::ensure_items(&cmd.items)?;

        Ok(vec![InvoiceEvent::ItemsReplaced(ItemsReplaced {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::conflict(format!(
                "cannot confirm an invoice in status {}",
                self.status
            )));
        }
        Self::ensure_items(&self.items)?;

        let number = cmd.number.trim();
        if number.is_empty() {
            return Err(DomainError::validation("invoice number must not be blank"));
        }

        Ok(vec![InvoiceEvent::InvoiceConfirmed(InvoiceConfirmed {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            number: number.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pay(&self, cmd: &PayInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        match self.status {
            InvoiceStatus::Pending => {}
            InvoiceStatus::Draft => {
                return Err(DomainError::invariant(
                    "cannot pay a draft invoice; confirm it first",
                ));
            }
            InvoiceStatus::Paid => {
                return Err(DomainError::conflict("invoice is already paid"));
            }
        }

        Ok(vec![InvoiceEvent::InvoicePaid(InvoicePaid {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            payment_method: cmd.payment_method,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft("delete invoice")?;

        Ok(vec![InvoiceEvent::InvoiceDeleted(InvoiceDeleted {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_company_id() -> CompanyId {
        CompanyId::new()
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_client_id() -> ClientId {
        ClientId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn line(quantity: Decimal, price: Decimal, rate: Decimal) -> InvoiceItem {
        InvoiceItem::new("Consulting", quantity, price, rate).unwrap()
    }

    fn create_cmd(company_id: CompanyId, invoice_id: InvoiceId) -> CreateDraft {
        CreateDraft {
            company_id,
            invoice_id,
            client_id: test_client_id(),
            series: "INV".into(),
            reference: Some("PO-7".into()),
            description: None,
            currency: CurrencyCode::new("EUR").unwrap(),
            emission_date: date(2024, 5, 2),
            due: DueDate::InDays(30),
            items: vec![line(dec!(2), dec!(100), dec!(21))],
            occurred_at: test_time(),
        }
    }

    /// A created draft plus the ids used to create it.
    fn draft() -> (Invoice, CompanyId, InvoiceId) {
        let company_id = test_company_id();
        let invoice_id = test_invoice_id();
        let mut invoice = Invoice::empty(invoice_id);
        invoice
            .execute(&InvoiceCommand::CreateDraft(create_cmd(company_id, invoice_id)))
            .unwrap();
        (invoice, company_id, invoice_id)
    }

    fn confirm(invoice: &mut Invoice, company_id: CompanyId, invoice_id: InvoiceId) {
        invoice
            .execute(&InvoiceCommand::ConfirmInvoice(ConfirmInvoice {
                company_id,
                invoice_id,
                number: "0001".into(),
                occurred_at: test_time(),
            }))
            .unwrap();
    }

    fn pay(
        invoice: &mut Invoice,
        company_id: CompanyId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        invoice.execute(&InvoiceCommand::PayInvoice(PayInvoice {
            company_id,
            invoice_id,
            payment_method: Some(PaymentMethod::BankTransfer),
            occurred_at: test_time(),
        }))
    }

    fn replace_items(
        invoice: &Invoice,
        company_id: CompanyId,
        invoice_id: InvoiceId,
        items: Vec<InvoiceItem>,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        invoice.handle(&InvoiceCommand::ReplaceItems(ReplaceItems {
            company_id,
            invoice_id,
            items,
            occurred_at: test_time(),
        }))
    }

    #[test]
    fn create_draft_emits_draft_created_event() {
        let company_id = test_company_id();
        let invoice_id = test_invoice_id();
        let invoice = Invoice::empty(invoice_id);

        let events = invoice
            .handle(&InvoiceCommand::CreateDraft(create_cmd(company_id, invoice_id)))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            InvoiceEvent::DraftCreated(e) => {
                assert_eq!(e.company_id, company_id);
                assert_eq!(e.invoice_id, invoice_id);
                assert_eq!(e.due_date, date(2024, 6, 1));
                assert_eq!(e.reference.as_deref(), Some("PO-7"));
                assert_eq!(e.items.len(), 1);
            }
            _ => panic!("Expected DraftCreated event"),
        }
        assert_eq!(events[0].event_type(), "invoicing.invoice.draft_created");
    }

    #[test]
    fn draft_exposes_totals_and_status() {
        let (invoice, _, _) = draft();
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.version(), 1);
        assert_eq!(invoice.number(), None);
        assert_eq!(invoice.display_number(), None);
        assert_eq!(invoice.totals().total(), dec!(242));
        assert_eq!(invoice.formatted_total("es-ES"), "242,00\u{a0}€");
        // Drafts are never overdue, however late.
        assert_eq!(invoice.effective_status(date(2030, 1, 1)), EffectiveStatus::Draft);
    }

    #[test]
    fn cannot_create_without_items() {
        let company_id = test_company_id();
        let invoice_id = test_invoice_id();
        let mut cmd = create_cmd(company_id, invoice_id);
        cmd.items.clear();

        let err = Invoice::empty(invoice_id)
            .handle(&InvoiceCommand::CreateDraft(cmd))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("invoice must have at least one item"));
    }

    #[test]
    fn cannot_create_with_due_date_before_emission() {
        let company_id = test_company_id();
        let invoice_id = test_invoice_id();
        let mut cmd = create_cmd(company_id, invoice_id);
        cmd.due = DueDate::On(date(2024, 5, 1));

        let err = Invoice::empty(invoice_id)
            .handle(&InvoiceCommand::CreateDraft(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("due date")));
    }

    #[test]
    fn cannot_create_twice() {
        let (invoice, company_id, invoice_id) = draft();
        let err = invoice
            .handle(&InvoiceCommand::CreateDraft(create_cmd(company_id, invoice_id)))
            .unwrap_err();
        assert_eq!(err, DomainError::conflict("invoice already exists"));
    }

    #[test]
    fn draft_items_can_be_replaced() {
        let (mut invoice, company_id, invoice_id) = draft();
        let items = vec![
            line(dec!(2), dec!(100), dec!(21)),
            line(dec!(1), dec!(50), dec!(10)),
        ];
        let events = replace_items(&invoice, company_id, invoice_id, items).unwrap();
        invoice.apply(&events[0]);

        let totals = invoice.totals();
        assert_eq!(totals.subtotal(), dec!(250));
        assert_eq!(totals.tax(), dec!(47));
        assert_eq!(totals.total(), dec!(297));
        assert_eq!(invoice.version(), 2);
    }

    #[test]
    fn items_cannot_be_emptied() {
        let (invoice, company_id, invoice_id) = draft();
        let err = replace_items(&invoice, company_id, invoice_id, Vec::new()).unwrap_err();
        assert_eq!(err, DomainError::validation("invoice must have at least one item"));
    }

    #[test]
    fn item_count_is_capped() {
        let (invoice, company_id, invoice_id) = draft();
        let largest = line(
            crate::item::MAX_ITEM_MAGNITUDE,
            crate::item::MAX_ITEM_MAGNITUDE,
            dec!(100),
        );

        let at_cap = vec![largest.clone(); MAX_ITEMS_PER_INVOICE];
        assert!(replace_items(&invoice, company_id, invoice_id, at_cap).is_ok());

        let over_cap = vec![largest; MAX_ITEMS_PER_INVOICE + 1];
        let err = replace_items(&invoice, company_id, invoice_id, over_cap).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn revise_draft_updates_header_fields() {
        let (mut invoice, company_id, invoice_id) = draft();
        let new_client = test_client_id();
        invoice
            .execute(&InvoiceCommand::ReviseDraft(ReviseDraft {
                company_id,
                invoice_id,
                client_id: Some(new_client),
                reference: Some(String::new()),
                description: Some("May retainer".into()),
                currency: Some(CurrencyCode::new("usd").unwrap()),
                emission_date: None,
                due_date: Some(date(2024, 5, 20)),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(invoice.client_id(), Some(new_client));
        assert_eq!(invoice.reference(), None);
        assert_eq!(invoice.description(), Some("May retainer"));
        assert_eq!(invoice.currency().map(CurrencyCode::as_str), Some("USD"));
        assert_eq!(invoice.due_date(), Some(date(2024, 5, 20)));
        assert_eq!(invoice.emission_date(), Some(date(2024, 5, 2)));
    }

    #[test]
    fn confirm_assigns_number_and_locks_items() {
        let (mut invoice, company_id, invoice_id) = draft();
        confirm(&mut invoice, company_id, invoice_id);

        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.display_number().as_deref(), Some("INV-0001"));
        assert!(!invoice.is_modifiable());

        let err = replace_items(
            &invoice,
            company_id,
            invoice_id,
            vec![line(dec!(1), dec!(1), dec!(0))],
        )
        .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg)
                if msg.contains("only draft invoices can be modified") => {}
            _ => panic!("Expected InvariantViolation for editing a pending invoice"),
        }
    }

    #[test]
    fn confirm_requires_a_number() {
        let (invoice, company_id, invoice_id) = draft();
        let err = invoice
            .handle(&InvoiceCommand::ConfirmInvoice(ConfirmInvoice {
                company_id,
                invoice_id,
                number: "  ".into(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("invoice number must not be blank"));
    }

    #[test]
    fn cannot_pay_a_draft() {
        let (mut invoice, company_id, invoice_id) = draft();
        let err = pay(&mut invoice, company_id, invoice_id).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("confirm it first") => {}
            _ => panic!("Expected InvariantViolation for paying a draft"),
        }
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
    }

    #[test]
    fn paying_pending_invoice_marks_it_paid() {
        let (mut invoice, company_id, invoice_id) = draft();
        confirm(&mut invoice, company_id, invoice_id);
        pay(&mut invoice, company_id, invoice_id).unwrap();

        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(invoice.payment_method(), Some(PaymentMethod::BankTransfer));
        assert_eq!(invoice.paid_at(), Some(test_time()));
        assert_eq!(invoice.version(), 3);
    }

    #[test]
    fn paid_invoices_are_immutable() {
        let (mut invoice, company_id, invoice_id) = draft();
        confirm(&mut invoice, company_id, invoice_id);
        pay(&mut invoice, company_id, invoice_id).unwrap();

        let err = replace_items(
            &invoice,
            company_id,
            invoice_id,
            vec![line(dec!(1), dec!(1), dec!(0))],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("paid invoices are immutable")));

        let err = pay(&mut invoice, company_id, invoice_id).unwrap_err();
        assert_eq!(err, DomainError::conflict("invoice is already paid"));

        let err = invoice
            .handle(&InvoiceCommand::DeleteInvoice(DeleteInvoice {
                company_id,
                invoice_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn pending_invoice_becomes_overdue_after_due_date() {
        let (mut invoice, company_id, invoice_id) = draft();
        confirm(&mut invoice, company_id, invoice_id);

        assert_eq!(invoice.effective_status(date(2024, 6, 1)), EffectiveStatus::Pending);
        assert_eq!(invoice.effective_status(date(2024, 6, 2)), EffectiveStatus::Overdue);

        pay(&mut invoice, company_id, invoice_id).unwrap();
        assert_eq!(invoice.effective_status(date(2024, 6, 2)), EffectiveStatus::Paid);
    }

    #[test]
    fn only_drafts_can_be_deleted() {
        let (mut invoice, company_id, invoice_id) = draft();
        let delete = InvoiceCommand::DeleteInvoice(DeleteInvoice {
            company_id,
            invoice_id,
            occurred_at: test_time(),
        });

        invoice.execute(&delete).unwrap();
        assert!(invoice.is_deleted());
        assert!(!invoice.is_live());

        // A deleted invoice no longer exists for any command.
        assert_eq!(invoice.handle(&delete).unwrap_err(), DomainError::NotFound);
        let err = replace_items(
            &invoice,
            company_id,
            invoice_id,
            vec![line(dec!(1), dec!(1), dec!(0))],
        )
        .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn commands_from_another_company_are_rejected() {
        let (invoice, _, invoice_id) = draft();
        let err = replace_items(
            &invoice,
            test_company_id(),
            invoice_id,
            vec![line(dec!(1), dec!(1), dec!(0))],
        )
        .unwrap_err();
        assert_eq!(err, DomainError::invariant("company mismatch"));
    }

    #[test]
    fn commands_on_missing_invoice_are_not_found() {
        let invoice = Invoice::empty(test_invoice_id());
        let err = invoice
            .handle(&InvoiceCommand::PayInvoice(PayInvoice {
                company_id: test_company_id(),
                invoice_id: invoice.id_typed(),
                payment_method: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn rehydration_replays_history() {
        let company_id = test_company_id();
        let invoice_id = test_invoice_id();
        let mut live = Invoice::empty(invoice_id);
        let mut history = live
            .execute(&InvoiceCommand::CreateDraft(create_cmd(company_id, invoice_id)))
            .unwrap();
        history.extend(
            live.execute(&InvoiceCommand::ConfirmInvoice(ConfirmInvoice {
                company_id,
                invoice_id,
                number: "0042".into(),
                occurred_at: test_time(),
            }))
            .unwrap(),
        );

        let rebuilt = Invoice::from_events(invoice_id, &history);
        assert_eq!(rebuilt, live);
        assert_eq!(rebuilt.version(), 2);
    }

    #[test]
    fn events_serialize_with_camel_case_items() {
        let (invoice, company_id, invoice_id) = draft();
        let events = replace_items(
            &invoice,
            company_id,
            invoice_id,
            vec![line(dec!(1), dec!(9.99), dec!(10))],
        )
        .unwrap();
        let json = serde_json::to_value(&events[0]).unwrap();
        let item = &json["ItemsReplaced"]["items"][0];
        assert_eq!(item["price"], "9.99");
        assert_eq!(item["taxRate"], "10");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: handle never mutates state and is deterministic.
        #[test]
        fn handle_is_deterministic(cents in 0i64..1_000_000i64, quantity in 0i64..100i64) {
            let (invoice, company_id, invoice_id) = draft();
            let before = invoice.clone();
            let items = vec![line(
                Decimal::from(quantity),
                Decimal::new(cents, 2),
                dec!(21),
            )];

            let first = replace_items(&invoice, company_id, invoice_id, items.clone());
            let second = replace_items(&invoice, company_id, invoice_id, items);

            prop_assert_eq!(&invoice, &before);
            prop_assert_eq!(first, second);
        }
    }
}
