//! Company-level invoicing defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::{format_currency, CurrencyCode};
use crate::invoice::DueDate;

pub const ENV_DEFAULT_CURRENCY: &str = "BILLDESK_DEFAULT_CURRENCY";
pub const ENV_DEFAULT_LOCALE: &str = "BILLDESK_DEFAULT_LOCALE";
pub const ENV_DEFAULT_DUE_DAYS: &str = "BILLDESK_DEFAULT_DUE_DAYS";
pub const ENV_DEFAULT_SERIES: &str = "BILLDESK_DEFAULT_SERIES";

/// Defaults applied when a new draft is created without explicit values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoicingConfig {
    pub default_currency: CurrencyCode,
    pub default_locale: String,
    pub default_due_days: u32,
    pub default_series: String,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::eur(),
            default_locale: "en-US".to_string(),
            default_due_days: 30,
            default_series: "INV".to_string(),
        }
    }
}

impl InvoicingConfig {
    /// Read overrides from `BILLDESK_DEFAULT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep their
    /// default; invalid values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(raw) = value(ENV_DEFAULT_CURRENCY) {
            match CurrencyCode::new(&raw) {
                Ok(code) => config.default_currency = code,
                Err(err) => {
                    tracing::warn!(key = ENV_DEFAULT_CURRENCY, value = %raw, error = %err, "ignoring invalid setting")
                }
            }
        }
        if let Some(raw) = value(ENV_DEFAULT_LOCALE) {
            config.default_locale = raw;
        }
        if let Some(raw) = value(ENV_DEFAULT_DUE_DAYS) {
            match raw.parse::<u32>() {
                Ok(days) => config.default_due_days = days,
                Err(err) => {
                    tracing::warn!(key = ENV_DEFAULT_DUE_DAYS, value = %raw, error = %err, "ignoring invalid setting")
                }
            }
        }
        if let Some(raw) = value(ENV_DEFAULT_SERIES) {
            config.default_series = raw;
        }
        config
    }

    pub fn default_due(&self) -> DueDate {
        DueDate::InDays(self.default_due_days)
    }

    /// Format `amount` in the default currency and locale.
    pub fn format_amount(&self, amount: Decimal) -> String {
        format_currency(amount, self.default_currency.as_str(), &self.default_locale)
    }
}
