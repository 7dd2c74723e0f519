use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Paint,
    #[serde(alias = "replacement")]
    PartReplacement,
    BodyReplacement,
    HoodReplacement,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    #[serde(other)]
    Unspecified,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRecord {
    #[serde(default, alias = "type")]
    pub kind: DamageKind,
    #[serde(default)]
    pub part: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl DamageRecord {
    pub fn new(kind: DamageKind) -> Self {
        Self { kind, part: None, severity: None }
    }

    pub fn paint(part: &str, severity: Severity) -> Self {
        Self { kind: DamageKind::Paint, part: Some(part.to_string()), severity: Some(severity) }
    }

    pub fn part_replacement(part: &str) -> Self {
        Self { kind: DamageKind::PartReplacement, part: Some(part.to_string()), severity: None }
    }
}

/// Extra multiplicative factors applied on top of depreciation and condition.
/// All default to one, which leaves the price untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAdjustments {
    #[serde(default = "one")]
    pub options_factor: Decimal,
    #[serde(default = "one")]
    pub brand_popularity: Decimal,
    #[serde(default = "one")]
    pub market_factor: Decimal,
}

impl Default for MarketAdjustments {
    fn default() -> Self {
        Self {
            options_factor: Decimal::ONE,
            brand_popularity: Decimal::ONE,
            market_factor: Decimal::ONE,
        }
    }
}

fn one() -> Decimal {
    Decimal::ONE
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationInput {
    pub base_price: Decimal,
    pub age_years: u32,
    pub mileage_km: u64,
    #[serde(default)]
    pub damages: Vec<DamageRecord>,
    #[serde(default)]
    pub adjustments: MarketAdjustments,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub lower_bound: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub upper_bound: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub annual_depreciation_factor: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mileage_depreciation_factor: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub condition_factor: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub options_factor: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub brand_popularity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub market_factor: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValuationResult {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{DamageKind, DamageRecord, DepreciationInput, MarketAdjustments, Severity};
    use crate::valuation::condition_factor;

    #[test]
    fn legacy_damage_payload_is_accepted() {
        let damages: Vec<DamageRecord> = serde_json::from_value(json!([
            { "type": "paint", "part": "roof", "severity": "major" },
            { "type": "replacement", "part": "headlight" },
            { "type": "sunroof_crack" },
            { "type": "paint", "part": "door", "severity": "moderate" },
            { "part": "trunk" }
        ]))
        .expect("damages should deserialize");

        assert_eq!(damages[0].kind, DamageKind::Paint);
        assert_eq!(damages[0].severity, Some(Severity::Major));
        assert_eq!(damages[1].kind, DamageKind::PartReplacement);
        assert_eq!(damages[2].kind, DamageKind::Unknown);
        assert_eq!(damages[3].severity, Some(Severity::Unspecified));
        assert_eq!(condition_factor(&damages[3..4], 3), Decimal::new(97, 2));
        assert_eq!(damages[4].kind, DamageKind::Unknown);
        assert_eq!(condition_factor(&damages[4..], 3), Decimal::ONE);
    }

    #[test]
    fn adjustments_default_to_one_when_omitted() {
        let input: DepreciationInput = serde_json::from_value(json!({
            "base_price": 500000000,
            "age_years": 3,
            "mileage_km": 75000
        }))
        .expect("input should deserialize");

        assert_eq!(input.base_price, Decimal::from(500_000_000u64));
        assert!(input.damages.is_empty());
        assert_eq!(input.adjustments, MarketAdjustments::default());
    }
}
