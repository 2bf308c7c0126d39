use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use billdesk_core::DomainError;

/// Stored invoice status lifecycle: `Draft -> Pending -> Paid`.
///
/// Overdue is never stored; see [`EffectiveStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
}

/// Status shown to users, derived from the stored status and the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveStatus {
    Draft,
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
        }
    }
}

impl EffectiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveStatus::Draft => "DRAFT",
            EffectiveStatus::Pending => "PENDING",
            EffectiveStatus::Paid => "PAID",
            EffectiveStatus::Overdue => "OVERDUE",
        }
    }

    /// Still awaiting payment (pending or overdue).
    pub fn is_outstanding(self) -> bool {
        matches!(self, EffectiveStatus::Pending | EffectiveStatus::Overdue)
    }
}

impl From<InvoiceStatus> for EffectiveStatus {
    fn from(value: InvoiceStatus) -> Self {
        match value {
            InvoiceStatus::Draft => EffectiveStatus::Draft,
            InvoiceStatus::Pending => EffectiveStatus::Pending,
            InvoiceStatus::Paid => EffectiveStatus::Paid,
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Err(DomainError::validation(
                "OVERDUE is derived from the due date and cannot be stored",
            )),
            other => Err(DomainError::validation(format!(
                "unknown invoice status '{other}'"
            ))),
        }
    }
}

impl core::str::FromStr for EffectiveStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("OVERDUE") {
            return Ok(EffectiveStatus::Overdue);
        }
        s.parse::<InvoiceStatus>().map(EffectiveStatus::from)
    }
}

/// Anything that names a calendar day. Time of day is discarded.
pub trait CalendarDate {
    fn calendar_date(&self) -> NaiveDate;
}

impl CalendarDate for NaiveDate {
    fn calendar_date(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDate for NaiveDateTime {
    fn calendar_date(&self) -> NaiveDate {
        self.date()
    }
}

/// The day is taken in the value's own timezone.
impl<Tz: TimeZone> CalendarDate for DateTime<Tz> {
    fn calendar_date(&self) -> NaiveDate {
        self.date_naive()
    }
}

impl<T: CalendarDate + ?Sized> CalendarDate for &T {
    fn calendar_date(&self) -> NaiveDate {
        (**self).calendar_date()
    }
}

/// Derive the status shown to users.
///
/// A pending invoice becomes overdue once `now` falls on a day strictly after
/// the due date (the due date itself counts as the last day to pay). Drafts
/// and paid invoices are never reclassified.
pub fn derive_effective_status(
    stored: InvoiceStatus,
    due_date: impl CalendarDate,
    now: impl CalendarDate,
) -> EffectiveStatus {
    match stored {
        InvoiceStatus::Pending if now.calendar_date() > due_date.calendar_date() => {
            EffectiveStatus::Overdue
        }
        other => other.into(),
    }
}
