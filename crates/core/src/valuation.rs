//! Used-car price estimation from a new-car base price.
//!
//! `final = base * (1 - annual) * (1 - mileage) * condition * options * brand * market`
//!
//! Annual depreciation compounds per whole year of age: 10% in the first year, 5% in
//! years two to four and a configurable rate afterwards. Mileage depreciation only
//! applies to kilometres beyond the expected yearly usage and is capped. The condition
//! factor multiplies one penalty per recorded damage.

use rust_decimal::Decimal;

use crate::config::ValuationConfig;
use crate::domain::valuation::{
    DamageKind, DamageRecord, DepreciationInput, MarketAdjustments, Severity, ValuationResult,
};
use crate::errors::DomainError;

const FIRST_YEAR_FACTOR: Decimal = Decimal::from_parts(90, 0, 0, false, 2);
const EARLY_YEARS_FACTOR: Decimal = Decimal::from_parts(95, 0, 0, false, 2);
const EARLY_YEARS_END: u32 = 4;

const SEVERE_PAINT_FACTOR: Decimal = Decimal::from_parts(91, 0, 0, false, 2);
const MINOR_PAINT_FACTOR: Decimal = Decimal::from_parts(97, 0, 0, false, 2);
const PART_REPLACEMENT_FACTOR: Decimal = Decimal::from_parts(95, 0, 0, false, 2);
const RECENT_BODY_REPLACEMENT_FACTOR: Decimal = Decimal::from_parts(75, 0, 0, false, 2);
const AGING_BODY_REPLACEMENT_FACTOR: Decimal = Decimal::from_parts(85, 0, 0, false, 2);
const HOOD_REPLACEMENT_FACTOR: Decimal = Decimal::from_parts(91, 0, 0, false, 2);
const SEVERE_PAINT_PARTS: &[&str] = &["roof", "chassis"];

pub trait ValuationEngine: Send + Sync {
    fn valuate(&self, input: &DepreciationInput) -> ValuationResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DepreciationValuationEngine {
    config: ValuationConfig,
}

impl DepreciationValuationEngine {
    pub fn new(config: ValuationConfig) -> Self {
        Self { config }
    }

    pub fn try_valuate(&self, input: &DepreciationInput) -> Result<ValuationResult, DomainError> {
        if input.base_price <= Decimal::ZERO {
            return Err(DomainError::InvalidInput(format!(
                "base price must be positive, got {}",
                input.base_price
            )));
        }

        let annual = annual_depreciation(input.age_years, &self.config);
        let mileage = mileage_depreciation(input.age_years, input.mileage_km, &self.config)?;
        let condition = condition_factor(&input.damages, input.age_years);
        let MarketAdjustments { options_factor, brand_popularity, market_factor } =
            input.adjustments;

        let factors = [
            ("annual_depreciation", Decimal::ONE - annual),
            ("mileage_depreciation", Decimal::ONE - mileage),
            ("condition", condition),
            ("options", options_factor),
            ("brand_popularity", brand_popularity),
            ("market", market_factor),
        ];
        let mut final_price = input.base_price;
        for (stage, factor) in factors {
            final_price = final_price
                .checked_mul(factor)
                .ok_or(DomainError::ValuationOverflow { stage })?;
        }

        let (lower_bound, upper_bound) = spread(final_price, self.config.range_spread)
            .ok_or(DomainError::ValuationOverflow { stage: "price_range" })?;

        Ok(ValuationResult {
            base_price: input.base_price,
            final_price,
            lower_bound,
            upper_bound,
            annual_depreciation_factor: annual,
            mileage_depreciation_factor: mileage,
            condition_factor: condition,
            options_factor,
            brand_popularity,
            market_factor,
            error: None,
        })
    }

    fn fallback(&self, input: &DepreciationInput, error: &DomainError) -> ValuationResult {
        let base = input.base_price;
        let (lower_bound, upper_bound) =
            spread(base, self.config.range_spread).unwrap_or((base, base));

        ValuationResult {
            base_price: base,
            final_price: base,
            lower_bound,
            upper_bound,
            annual_depreciation_factor: Decimal::ZERO,
            mileage_depreciation_factor: Decimal::ZERO,
            condition_factor: Decimal::ONE,
            options_factor: input.adjustments.options_factor,
            brand_popularity: input.adjustments.brand_popularity,
            market_factor: input.adjustments.market_factor,
            error: Some(error.to_string()),
        }
    }
}

impl ValuationEngine for DepreciationValuationEngine {
    /// Never fails: any error is folded into a result that carries the unmodified base
    /// price and an `error` message.
    fn valuate(&self, input: &DepreciationInput) -> ValuationResult {
        match self.try_valuate(input) {
            Ok(result) => result,
            Err(error) => {
                tracing::error!(
                    event_name = "valuation.fallback",
                    base_price = %input.base_price,
                    age_years = input.age_years,
                    mileage_km = input.mileage_km,
                    error = %error,
                    "valuation failed, returning base price"
                );
                self.fallback(input, &error)
            }
        }
    }
}

/// `1 - product(yearly retention factors)`; zero for a new car.
pub fn annual_depreciation(age_years: u32, config: &ValuationConfig) -> Decimal {
    let mut retained = Decimal::ONE;
    for year in 1..=age_years {
        let factor = match year {
            1 => FIRST_YEAR_FACTOR,
            2..=EARLY_YEARS_END => EARLY_YEARS_FACTOR,
            _ => config.post_four_year_factor,
        };
        let next = retained * factor;
        // Rounding pins tiny values in place; further years change nothing.
        if next == retained {
            break;
        }
        retained = next;
    }
    Decimal::ONE - retained
}

/// Depreciation for kilometres beyond `age * expected_km_per_year`, capped at
/// `max_mileage_depreciation`.
pub fn mileage_depreciation(
    age_years: u32,
    mileage_km: u64,
    config: &ValuationConfig,
) -> Result<Decimal, DomainError> {
    let expected = u64::from(age_years).saturating_mul(config.expected_km_per_year);
    if mileage_km <= expected {
        return Ok(Decimal::ZERO);
    }

    let excess = Decimal::from(mileage_km - expected);
    let steps = excess
        .checked_div(Decimal::from(config.km_step))
        .ok_or(DomainError::ValuationOverflow { stage: "mileage_depreciation" })?;
    let depreciation = steps
        .checked_mul(config.km_step_rate)
        .ok_or(DomainError::ValuationOverflow { stage: "mileage_depreciation" })?;

    Ok(depreciation.min(config.max_mileage_depreciation))
}

/// Product of one penalty per damage. Unknown damage kinds carry no penalty.
pub fn condition_factor(damages: &[DamageRecord], age_years: u32) -> Decimal {
    damages.iter().fold(Decimal::ONE, |factor, damage| factor * damage_factor(damage, age_years))
}

fn damage_factor(damage: &DamageRecord, age_years: u32) -> Decimal {
    match damage.kind {
        DamageKind::Paint => {
            let severe_part = damage.part.as_deref().is_some_and(|part| {
                let part = part.trim();
                SEVERE_PAINT_PARTS.iter().any(|severe| part.eq_ignore_ascii_case(severe))
            });
            if severe_part || damage.severity == Some(Severity::Major) {
                SEVERE_PAINT_FACTOR
            } else {
                MINOR_PAINT_FACTOR
            }
        }
        DamageKind::PartReplacement => PART_REPLACEMENT_FACTOR,
        DamageKind::BodyReplacement => match age_years {
            0..=10 => RECENT_BODY_REPLACEMENT_FACTOR,
            11..=15 => AGING_BODY_REPLACEMENT_FACTOR,
            _ => Decimal::ONE,
        },
        DamageKind::HoodReplacement => HOOD_REPLACEMENT_FACTOR,
        DamageKind::Unknown => {
            tracing::debug!(
                event_name = "valuation.damage.ignored",
                part = damage.part.as_deref().unwrap_or(""),
                "unknown damage kind contributes no penalty"
            );
            Decimal::ONE
        }
    }
}

fn spread(price: Decimal, spread: Decimal) -> Option<(Decimal, Decimal)> {
    let lower = price.checked_mul(Decimal::ONE - spread)?;
    let upper = price.checked_mul(Decimal::ONE + spread)?;
    Some((lower, upper))
}
