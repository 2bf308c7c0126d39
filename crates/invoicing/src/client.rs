use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billdesk_core::{AggregateId, CompanyId, DomainError, DomainResult, Entity};

use crate::item::non_blank;

/// Client identifier (company-scoped via `company_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub AggregateId);

impl ClientId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Validated client contact and billing details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
}

/// Client form payload (create or partial update).
///
/// On create, `name` is required. On update, absent fields are left alone and
/// a field sent as an empty string is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
}

impl TryFrom<ClientDraft> for ClientDetails {
    type Error = DomainError;

    fn try_from(draft: ClientDraft) -> Result<Self, Self::Error> {
        let mut details = ClientDetails::default();
        details.merge(draft)?;
        Ok(details)
    }
}

impl From<ClientDetails> for ClientDraft {
    fn from(details: ClientDetails) -> Self {
        Self {
            name: Some(details.name),
            email: details.email,
            phone: details.phone,
            street: details.street,
            city: details.city,
            postal_code: details.postal_code,
            state: details.state,
            country: details.country,
            vat_number: details.vat_number,
        }
    }
}

impl ClientDetails {
    /// Run stored details through the same rules as a fresh form submission.
    pub(crate) fn revalidated(self, party: &str) -> DomainResult<Self> {
        let mut details = ClientDetails::default();
        details.merge_for(party, ClientDraft::from(self))?;
        Ok(details)
    }

    fn merge(&mut self, draft: ClientDraft) -> DomainResult<()> {
        self.merge_for("client", draft)
    }

    /// Merge a partial update, naming `party` in validation messages.
    pub(crate) fn merge_for(&mut self, party: &str, draft: ClientDraft) -> DomainResult<()> {
        if let Some(name) = draft.name {
            self.name = name;
        }
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation(format!(
                "{party} name must not be blank"
            )));
        }

        if let Some(email) = draft.email {
            let email = non_blank(email);
            if let Some(address) = &email {
                validate_email(party, address)?;
            }
            self.email = email;
        }

        let optional = [
            (&mut self.phone, draft.phone),
            (&mut self.street, draft.street),
            (&mut self.city, draft.city),
            (&mut self.postal_code, draft.postal_code),
            (&mut self.state, draft.state),
            (&mut self.country, draft.country),
            (&mut self.vat_number, draft.vat_number),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                *field = non_blank(value);
            }
        }
        Ok(())
    }
}

fn validate_email(party: &str, address: &str) -> DomainResult<()> {
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(DomainError::validation(format!(
            "{party} email '{address}' is not a valid address"
        ))),
    }
}

/// A client of a company: the party invoices are issued to.
///
/// Removal is a soft delete: the record stays so that invoices issued to the
/// client keep resolving, but it no longer accepts updates or shows in lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ClientRecord")]
pub struct Client {
    id: ClientId,
    company_id: CompanyId,
    #[serde(flatten)]
    details: ClientDetails,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    removed_at: Option<DateTime<Utc>>,
}

/// Stored shape of a client, validated on the way in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRecord {
    id: ClientId,
    company_id: CompanyId,
    #[serde(flatten)]
    details: ClientDetails,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    removed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ClientRecord> for Client {
    type Error = DomainError;

    fn try_from(record: ClientRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            company_id: record.company_id,
            details: record.details.revalidated("client")?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            removed_at: record.removed_at,
        })
    }
}

impl Client {
    pub fn register(
        id: ClientId,
        company_id: CompanyId,
        draft: ClientDraft,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let details = ClientDetails::try_from(draft)?;
        Ok(Self {
            id,
            company_id,
            details,
            created_at,
            updated_at: created_at,
            removed_at: None,
        })
    }

    /// Apply a partial update. On failure the client is left unchanged.
    pub fn update(&mut self, changes: ClientDraft, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_active()?;
        let mut details = self.details.clone();
        details.merge(changes)?;
        self.details = details;
        self.updated_at = occurred_at;
        Ok(())
    }

    /// Remove the client from the company's client list.
    pub fn remove(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_active()?;
        self.removed_at = Some(occurred_at);
        self.updated_at = occurred_at;
        Ok(())
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if self.is_removed() {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    pub fn removed_at(&self) -> Option<DateTime<Utc>> {
        self.removed_at
    }

    pub fn id_typed(&self) -> ClientId {
        self.id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn details(&self) -> &ClientDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
