use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billdesk_core::{CompanyId, DomainError, DomainResult, Entity};

use crate::client::{ClientDetails, ClientDraft};
use crate::item::non_blank;

/// Company settings form payload. Same partial-update rules as [`ClientDraft`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyDraft {
    #[serde(flatten)]
    pub details: ClientDraft,
    pub bank_account_number: Option<String>,
}

/// The issuing company: its details are printed as the invoice sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CompanyRecord")]
pub struct Company {
    id: CompanyId,
    #[serde(flatten)]
    details: ClientDetails,
    bank_account_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRecord {
    id: CompanyId,
    #[serde(flatten)]
    details: ClientDetails,
    #[serde(default)]
    bank_account_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CompanyRecord> for Company {
    type Error = DomainError;

    fn try_from(record: CompanyRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            details: record.details.revalidated("company")?,
            bank_account_number: record.bank_account_number.and_then(non_blank),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl Company {
    pub fn register(
        id: CompanyId,
        draft: CompanyDraft,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut details = ClientDetails::default();
        details.merge_for("company", draft.details)?;
        Ok(Self {
            id,
            details,
            bank_account_number: draft.bank_account_number.and_then(non_blank),
            created_at,
            updated_at: created_at,
        })
    }

    /// Apply a partial update. On failure the company is left unchanged.
    pub fn update(&mut self, changes: CompanyDraft, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        let mut details = self.details.clone();
        details.merge_for("company", changes.details)?;
        self.details = details;
        if let Some(account) = changes.bank_account_number {
            self.bank_account_number = non_blank(account);
        }
        self.updated_at = occurred_at;
        Ok(())
    }

    pub fn id_typed(&self) -> CompanyId {
        self.id
    }

    pub fn details(&self) -> &ClientDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn bank_account_number(&self) -> Option<&str> {
        self.bank_account_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
