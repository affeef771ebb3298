//! Prices in minor currency units and their locale-aware display.
//!
//! The backend stores every price as an integer number of cents. Display
//! always shows two decimal digits in major units, using the decimal
//! separator of the storefront's locale (`1999` -> `"19,99"` in `pt-BR`).

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A price in minor currency units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(0);

    /// Create a price from minor currency units.
    #[must_use]
    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Amount in minor currency units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Amount in major currency units as an exact decimal.
    #[must_use]
    pub fn amount(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Price multiplied by a quantity, saturating on overflow.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Format the amount with two decimals and the locale's separator.
    ///
    /// ```rust
    /// # use neon_merch_core::{Locale, Price};
    /// assert_eq!(Price::from_minor_units(1999).format(Locale::PtBr), "19,99");
    /// assert_eq!(Price::from_minor_units(1999).format(Locale::EnUs), "19.99");
    /// ```
    #[must_use]
    pub fn format(self, locale: Locale) -> String {
        let fixed = format!("{:.2}", self.amount());
        match locale.decimal_separator() {
            '.' => fixed,
            separator => fixed.replace('.', &separator.to_string()),
        }
    }

    /// Format with the locale's currency symbol (e.g. `"R$ 19,99"`).
    #[must_use]
    pub fn display(self, locale: Locale) -> String {
        format!("{} {}", locale.currency_symbol(), self.format(locale))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Error parsing a locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale: {0} (expected pt-BR or en-US)")]
pub struct LocaleError(pub String);

/// Locales the storefront can format prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    /// Brazilian Portuguese, Brazilian real.
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    /// US English, US dollar.
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    /// Decimal separator used when formatting amounts.
    #[must_use]
    pub const fn decimal_separator(self) -> char {
        match self {
            Self::PtBr => ',',
            Self::EnUs => '.',
        }
    }

    /// Currency symbol shown before amounts.
    #[must_use]
    pub const fn currency_symbol(self) -> &'static str {
        match self {
            Self::PtBr => "R$",
            Self::EnUs => "$",
        }
    }

    /// BCP 47 language tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::PtBr => "pt-BR",
            Self::EnUs => "en-US",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Self::PtBr),
            "en-us" | "en" => Ok(Self::EnUs),
            _ => Err(LocaleError(s.to_string())),
        }
    }
}
