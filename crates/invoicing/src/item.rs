use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billdesk_core::{DomainError, DomainResult};

/// Largest accepted quantity or unit price.
///
/// Keeps `quantity × unit_price × rate` well inside `Decimal` range so the
/// calculator can stay infallible.
pub const MAX_ITEM_MAGNITUDE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0); // 1e12

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A validated invoice line item.
///
/// Fields are private: the only way to obtain an item is through
/// [`InvoiceItem::new`] or a [`InvoiceItemDraft`] conversion, both of which
/// enforce the ranges below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InvoiceItemDraft", into = "InvoiceItemDraft")]
pub struct InvoiceItem {
    name: String,
    description: Option<String>,
    quantity: Decimal,
    unit_price: Decimal,
    tax_rate_percent: Decimal,
}

impl InvoiceItem {
    /// Build an item, rejecting out-of-range values instead of clamping them.
    ///
    /// - `name` must not be blank
    /// - `0 <= quantity <= MAX_ITEM_MAGNITUDE`
    /// - `0 <= unit_price <= MAX_ITEM_MAGNITUDE`
    /// - `0 <= tax_rate_percent <= 100`
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate_percent: Decimal,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("item name must not be blank"));
        }
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(DomainError::validation("item quantity must not be negative"));
        }
        if quantity > MAX_ITEM_MAGNITUDE {
            return Err(DomainError::validation("item quantity is too large"));
        }
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(DomainError::validation("item unit price must not be negative"));
        }
        if unit_price > MAX_ITEM_MAGNITUDE {
            return Err(DomainError::validation("item unit price is too large"));
        }
        if tax_rate_percent < Decimal::ZERO || tax_rate_percent > HUNDRED {
            return Err(DomainError::validation(
                "item tax rate must be between 0 and 100 percent",
            ));
        }

        Ok(Self {
            name,
            description: None,
            quantity: quantity.normalize(),
            unit_price: unit_price.normalize(),
            tax_rate_percent: tax_rate_percent.normalize(),
        })
    }

    /// Attach a description. Blank descriptions are dropped.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_blank(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn tax_rate_percent(&self) -> Decimal {
        self.tax_rate_percent
    }
}

/// Wire shape of an item as submitted by the invoice form.
///
/// `price` accepts either a JSON number or a decimal string; `taxRate` may be
/// omitted and then defaults to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
}

impl TryFrom<InvoiceItemDraft> for InvoiceItem {
    type Error = DomainError;

    fn try_from(draft: InvoiceItemDraft) -> Result<Self, Self::Error> {
        let item = InvoiceItem::new(draft.name, draft.quantity, draft.price, draft.tax_rate)?;
        Ok(match draft.description {
            Some(description) => item.with_description(description),
            None => item,
        })
    }
}

impl From<InvoiceItem> for InvoiceItemDraft {
    fn from(item: InvoiceItem) -> Self {
        Self {
            name: item.name,
            description: item.description,
            quantity: item.quantity,
            price: item.unit_price,
            tax_rate: item.tax_rate_percent,
        }
    }
}

/// Validate a whole list of drafts, reporting the first failing line (1-based).
pub fn validate_items(drafts: Vec<InvoiceItemDraft>) -> DomainResult<Vec<InvoiceItem>> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(idx, draft)| {
            InvoiceItem::try_from(draft).map_err(|err| match err {
                DomainError::Validation(msg) => {
                    DomainError::validation(format!("line {}: {}", idx + 1, msg))
                }
                other => other,
            })
        })
        .collect()
}

pub(crate) fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn magnitude_limit_is_one_trillion() {
        assert_eq!(MAX_ITEM_MAGNITUDE, dec!(1000000000000));
    }

    #[test]
    fn new_trims_name_and_keeps_values() {
        let item = InvoiceItem::new("  Consulting ", dec!(2), dec!(100.00), dec!(21)).unwrap();
        assert_eq!(item.name(), "Consulting");
        assert_eq!(item.quantity(), dec!(2));
        assert_eq!(item.unit_price(), dec!(100));
        assert_eq!(item.tax_rate_percent(), dec!(21));
        assert_eq!(item.description(), None);
    }

    #[test]
    fn zero_values_are_accepted() {
        assert!(InvoiceItem::new("Free sample", dec!(0), dec!(0), dec!(0)).is_ok());
        assert!(InvoiceItem::new("Full rate", dec!(1), dec!(1), dec!(100)).is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let cases = [
            (dec!(-1), dec!(10), dec!(0), "quantity must not be negative"),
            (dec!(1), dec!(-0.01), dec!(0), "unit price must not be negative"),
            (dec!(1), dec!(10), dec!(-1), "tax rate"),
            (dec!(1), dec!(10), dec!(100.5), "tax rate"),
            (dec!(1000000000001), dec!(1), dec!(0), "quantity is too large"),
        ];
        for (quantity, price, rate, expected) in cases {
            match InvoiceItem::new("Widget", quantity, price, rate) {
                Err(DomainError::Validation(msg)) => assert!(
                    msg.contains(expected),
                    "expected '{expected}' in '{msg}'"
                ),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = InvoiceItem::new("   ", dec!(1), dec!(1), dec!(0)).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("item name must not be blank")
        );
    }

    #[test]
    fn blank_description_is_dropped() {
        let item = InvoiceItem::new("Hosting", dec!(1), dec!(5), dec!(0))
            .unwrap()
            .with_description("   ");
        assert_eq!(item.description(), None);
    }

    #[test]
    fn draft_accepts_string_and_number_prices() {
        let json = r#"[
            {"name": "Design", "quantity": 2, "price": "100.50", "taxRate": 21},
            {"name": "Hosting", "description": "monthly", "quantity": 1, "price": 9.99}
        ]"#;
        let drafts: Vec<InvoiceItemDraft> = serde_json::from_str(json).unwrap();
        let items = validate_items(drafts).unwrap();

        assert_eq!(items[0].unit_price(), dec!(100.5));
        assert_eq!(items[0].tax_rate_percent(), dec!(21));
        assert_eq!(items[1].unit_price(), dec!(9.99));
        assert_eq!(items[1].tax_rate_percent(), Decimal::ZERO);
        assert_eq!(items[1].description(), Some("monthly"));
    }

    #[test]
    fn validate_items_reports_the_failing_line() {
        let drafts = vec![
            InvoiceItemDraft {
                name: "Ok".into(),
                description: None,
                quantity: dec!(1),
                price: dec!(1),
                tax_rate: dec!(0),
            },
            InvoiceItemDraft {
                name: "Broken".into(),
                description: None,
                quantity: dec!(-3),
                price: dec!(1),
                tax_rate: dec!(0),
            },
        ];
        match validate_items(drafts).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.starts_with("line 2:")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn deserializing_an_item_goes_through_validation() {
        let json = r#"{"name": "Bad", "quantity": 1, "price": 1, "taxRate": 150}"#;
        assert!(serde_json::from_str::<InvoiceItem>(json).is_err());

        let json = r#"{"name": "Good", "quantity": 1, "price": 1, "taxRate": 10}"#;
        let item: InvoiceItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.tax_rate_percent(), dec!(10));
    }
}
