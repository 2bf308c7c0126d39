//! Currency codes and locale-aware amount formatting.
//!
//! Formatting is table-driven: a [`CurrencyFormatter`] owns a table of locale
//! conventions and a table of currency symbols. Adding a locale or currency is
//! a data change; callers keep calling [`format_currency`] or
//! [`CurrencyFormatter::format`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use billdesk_core::{DomainError, DomainResult, ValueObject};

/// Non-breaking space used between a number and its currency symbol.
pub const NBSP: char = '\u{a0}';

const FRACTION_DIGITS: u32 = 2;

/// An ISO 4217 alphabetic currency code (three ASCII letters, upper case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> DomainResult<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency code must be three letters, got '{code}'"
            )));
        }
        Ok(Self(code))
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where the currency symbol goes relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    Prefix,
    Suffix,
}

/// Number and symbol conventions for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleFormat {
    pub group_separator: String,
    pub decimal_separator: String,
    pub symbol_position: SymbolPosition,
    /// Whether a non-breaking space separates the symbol from the number.
    #[serde(default)]
    pub symbol_spacing: bool,
}

impl ValueObject for LocaleFormat {}

impl LocaleFormat {
    /// `$1,234.50`
    pub fn en_us() -> Self {
        Self {
            group_separator: ",".into(),
            decimal_separator: ".".into(),
            symbol_position: SymbolPosition::Prefix,
            symbol_spacing: false,
        }
    }

    /// `1.234,50 €`
    pub fn es_es() -> Self {
        Self {
            group_separator: ".".into(),
            decimal_separator: ",".into(),
            symbol_position: SymbolPosition::Suffix,
            symbol_spacing: true,
        }
    }
}

/// Table-driven currency formatter.
///
/// Locale tags are stored lower-cased and currency codes upper-cased, however
/// they were written in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CurrencyTable")]
pub struct CurrencyFormatter {
    locales: BTreeMap<String, LocaleFormat>,
    symbols: BTreeMap<String, String>,
    fallback_locale: String,
}

/// Formatter tables as written in configuration data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CurrencyTable {
    locales: BTreeMap<String, LocaleFormat>,
    symbols: BTreeMap<String, String>,
    fallback_locale: String,
}

impl From<CurrencyTable> for CurrencyFormatter {
    fn from(table: CurrencyTable) -> Self {
        Self {
            locales: table
                .locales
                .into_iter()
                .map(|(tag, format)| (normalize_tag(&tag), format))
                .collect(),
            symbols: table
                .symbols
                .into_iter()
                .map(|(code, symbol)| (normalize_code(&code), symbol))
                .collect(),
            fallback_locale: normalize_tag(&table.fallback_locale),
        }
    }
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::empty("en-US", LocaleFormat::en_us())
            .with_locale("es-ES", LocaleFormat::es_es())
            .with_currency("EUR", "€")
            .with_currency("USD", "$")
            .with_currency("GBP", "£")
            .with_currency("JPY", "¥")
            .with_currency("CAD", "CA$")
            .with_currency("AUD", "A$")
    }
}

static DEFAULT_FORMATTER: LazyLock<CurrencyFormatter> = LazyLock::new(CurrencyFormatter::default);

// Used when a deserialized table names a fallback locale it does not define.
static LAST_RESORT_FORMAT: LazyLock<LocaleFormat> = LazyLock::new(LocaleFormat::en_us);

impl CurrencyFormatter {
    /// A formatter with a single (fallback) locale and no known symbols.
    pub fn empty(fallback_tag: &str, fallback: LocaleFormat) -> Self {
        let fallback_locale = normalize_tag(fallback_tag);
        let mut locales = BTreeMap::new();
        locales.insert(fallback_locale.clone(), fallback);
        Self {
            locales,
            symbols: BTreeMap::new(),
            fallback_locale,
        }
    }

    /// The process-wide formatter with the built-in tables.
    pub fn shared() -> &'static CurrencyFormatter {
        &*DEFAULT_FORMATTER
    }

    /// Register (or replace) a locale.
    pub fn with_locale(mut self, tag: &str, format: LocaleFormat) -> Self {
        self.locales.insert(normalize_tag(tag), format);
        self
    }

    /// Register (or replace) a currency symbol.
    pub fn with_currency(mut self, code: &str, symbol: impl Into<String>) -> Self {
        self.symbols.insert(normalize_code(code), symbol.into());
        self
    }

    /// Symbol for `code`, or `None` when the currency is not in the table.
    pub fn known_symbol(&self, code: &str) -> Option<&str> {
        self.symbols
            .get(&normalize_code(code))
            .map(String::as_str)
    }

    /// Symbol for `code`, falling back to the upper-cased code itself.
    pub fn symbol(&self, code: &str) -> String {
        self.known_symbol(code)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_code(code))
    }

    /// Resolve a locale tag: exact match, then same language, then fallback.
    ///
    /// When several regions share the language, the fallback locale wins if
    /// it is one of them, otherwise the first tag in sorted order.
    pub fn locale(&self, tag: &str) -> &LocaleFormat {
        let tag = normalize_tag(tag);
        if let Some(format) = self.locales.get(&tag) {
            return format;
        }

        let language = primary_language(&tag);
        if primary_language(&self.fallback_locale) == language {
            if let Some(format) = self.locales.get(&self.fallback_locale) {
                return format;
            }
        }
        if let Some((_, format)) = self
            .locales
            .iter()
            .find(|(known, _)| primary_language(known) == language)
        {
            return format;
        }

        tracing::debug!(locale = %tag, fallback = %self.fallback_locale, "unknown locale, using fallback");
        self.locales
            .get(&self.fallback_locale)
            .unwrap_or(&*LAST_RESORT_FORMAT)
    }

    /// Format `amount` with exactly two fractional digits.
    ///
    /// Rounds half away from zero. Unknown currency codes are shown verbatim
    /// in place of a symbol, separated from the number by a space.
    pub fn format(&self, amount: Decimal, currency_code: &str, locale: &str) -> String {
        let format = self.locale(locale);
        let rounded =
            amount.round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let number = group_digits(rounded.abs(), format);

        let (symbol, spaced) = match self.known_symbol(currency_code) {
            Some(symbol) => (symbol.to_string(), format.symbol_spacing),
            None => (normalize_code(currency_code), true),
        };

        let mut out = String::with_capacity(number.len() + symbol.len() + 3);
        if negative {
            out.push('-');
        }
        if symbol.is_empty() {
            out.push_str(&number);
            return out;
        }
        match format.symbol_position {
            SymbolPosition::Prefix => {
                out.push_str(&symbol);
                if spaced {
                    out.push(NBSP);
                }
                out.push_str(&number);
            }
            SymbolPosition::Suffix => {
                out.push_str(&number);
                if spaced {
                    out.push(NBSP);
                }
                out.push_str(&symbol);
            }
        }
        out
    }
}

/// Format `amount` in `currency_code` for `locale` using the built-in tables.
pub fn format_currency(amount: Decimal, currency_code: &str, locale: &str) -> String {
    CurrencyFormatter::shared().format(amount, currency_code, locale)
}

/// Symbol for `currency_code` from the built-in table, or the code itself.
pub fn currency_symbol(currency_code: &str) -> String {
    CurrencyFormatter::shared().symbol(currency_code)
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

fn primary_language(tag: &str) -> &str {
    tag.split('-').next().unwrap_or_default()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn group_digits(value: Decimal, format: &LocaleFormat) -> String {
    let plain = format!("{:.*}", FRACTION_DIGITS as usize, value);
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3 * 3);
    let len = int_part.len();
    for (idx, digit) in int_part.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            grouped.push_str(&format.group_separator);
        }
        grouped.push(digit);
    }
    grouped.push_str(&format.decimal_separator);
    grouped.push_str(frac_part);
    grouped
}
