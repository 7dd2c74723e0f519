//! Human-readable rendering of whole currency amounts.
//!
//! Amounts are bucketed by magnitude and rendered as the largest unit plus the next one
//! down, for example `1 billion 500 million`. The next unit is omitted when it is zero.
//! Digit glyphs and unit words come from a [`PriceLocale`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::LocaleKind;
use crate::domain::valuation::ValuationResult;

const BILLION: u64 = 1_000_000_000;
const MILLION: u64 = 1_000_000;
const THOUSAND: u64 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Billions,
    Millions,
    Thousands,
    Units,
}

impl Magnitude {
    pub fn of(amount: u64) -> Self {
        if amount >= BILLION {
            Self::Billions
        } else if amount >= MILLION {
            Self::Millions
        } else if amount >= THOUSAND {
            Self::Thousands
        } else {
            Self::Units
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceLocale {
    pub digits: [char; 10],
    pub billion: String,
    pub million: String,
    pub thousand: String,
    /// Placed between the major and minor unit.
    pub joiner: String,
    pub currency: Option<String>,
    pub range_joiner: String,
}

impl PriceLocale {
    pub fn latin() -> Self {
        Self {
            digits: ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'],
            billion: "billion".to_string(),
            million: "million".to_string(),
            thousand: "thousand".to_string(),
            joiner: " ".to_string(),
            currency: None,
            range_joiner: "to".to_string(),
        }
    }

    pub fn persian() -> Self {
        Self {
            digits: ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'],
            billion: "میلیارد".to_string(),
            million: "میلیون".to_string(),
            thousand: "هزار".to_string(),
            joiner: " و ".to_string(),
            currency: Some("تومان".to_string()),
            range_joiner: "تا".to_string(),
        }
    }

    fn unit_word(&self, magnitude: Magnitude) -> Option<&str> {
        match magnitude {
            Magnitude::Billions => Some(&self.billion),
            Magnitude::Millions => Some(&self.million),
            Magnitude::Thousands => Some(&self.thousand),
            Magnitude::Units => None,
        }
    }
}

impl Default for PriceLocale {
    fn default() -> Self {
        Self::latin()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceFormatter {
    locale: PriceLocale,
}

impl PriceFormatter {
    pub fn new(locale: PriceLocale) -> Self {
        Self { locale }
    }

    pub fn from_kind(kind: LocaleKind) -> Self {
        match kind {
            LocaleKind::Latin => Self::new(PriceLocale::latin()),
            LocaleKind::Persian => Self::new(PriceLocale::persian()),
        }
    }

    pub fn locale(&self) -> &PriceLocale {
        &self.locale
    }

    pub fn format(&self, amount: u64) -> String {
        let (major, minor) = match Magnitude::of(amount) {
            Magnitude::Billions => (
                (amount / BILLION, Magnitude::Billions),
                (amount % BILLION / MILLION, Magnitude::Millions),
            ),
            Magnitude::Millions => (
                (amount / MILLION, Magnitude::Millions),
                (amount % MILLION / THOUSAND, Magnitude::Thousands),
            ),
            Magnitude::Thousands => (
                (amount / THOUSAND, Magnitude::Thousands),
                (amount % THOUSAND, Magnitude::Units),
            ),
            Magnitude::Units => return self.with_currency(self.digits(amount)),
        };

        let mut rendered = self.part(major.0, major.1);
        if minor.0 > 0 {
            rendered.push_str(&self.locale.joiner);
            rendered.push_str(&self.part(minor.0, minor.1));
        }
        self.with_currency(rendered)
    }

    /// Formats a decimal amount after truncating it to whole units. Negative values
    /// render as zero.
    pub fn format_decimal(&self, amount: Decimal) -> String {
        let whole = amount.trunc().max(Decimal::ZERO).to_u64().unwrap_or(u64::MAX);
        self.format(whole)
    }

    pub fn format_range(&self, lower: u64, upper: u64) -> String {
        format!("{} {} {}", self.format(lower), self.locale.range_joiner, self.format(upper))
    }

    /// Recovers the magnitude bucket of a string produced by [`PriceFormatter::format`].
    /// Returns `None` when the text holds no digits at all.
    pub fn parse_magnitude(&self, text: &str) -> Option<Magnitude> {
        let has_digit = text
            .chars()
            .any(|ch| ch.is_ascii_digit() || self.locale.digits.contains(&ch));
        if !has_digit {
            return None;
        }

        let magnitude = [Magnitude::Billions, Magnitude::Millions, Magnitude::Thousands]
            .into_iter()
            .find(|magnitude| {
                self.locale.unit_word(*magnitude).is_some_and(|word| contains_word(text, word))
            })
            .unwrap_or(Magnitude::Units);
        Some(magnitude)
    }

    fn part(&self, value: u64, magnitude: Magnitude) -> String {
        match self.locale.unit_word(magnitude) {
            Some(word) => format!("{} {word}", self.digits(value)),
            None => self.digits(value),
        }
    }

    fn digits(&self, value: u64) -> String {
        value
            .to_string()
            .bytes()
            .map(|digit| self.locale.digits[usize::from(digit - b'0')])
            .collect()
    }

    fn with_currency(&self, rendered: String) -> String {
        match &self.locale.currency {
            Some(currency) => format!("{rendered} {currency}"),
            None => rendered,
        }
    }
}

impl ValuationResult {
    /// Renders `lower_bound` to `upper_bound` in whole currency units.
    pub fn price_range_text(&self, formatter: &PriceFormatter) -> String {
        format!(
            "{} {} {}",
            formatter.format_decimal(self.lower_bound),
            formatter.locale().range_joiner,
            formatter.format_decimal(self.upper_bound)
        )
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split_whitespace().any(|token| token == word)
}
