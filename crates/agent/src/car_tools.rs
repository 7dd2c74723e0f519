//! Catalog search and valuation tools exposed to the conversational agent.
//!
//! Argument names follow the function-call contract the orchestrator was built
//! against (`car_name`, `company_name`, `car_age`, ...). Every call reads one catalog
//! snapshot up front, so a concurrent refresh never mixes two catalogs in one answer.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use khodroyar_core::config::AppConfig;
use khodroyar_core::domain::listing::CarListing;
use khodroyar_core::domain::valuation::{DamageRecord, DepreciationInput, MarketAdjustments};
use khodroyar_core::{
    BudgetRangeSearch, CarDetails, CatalogMatcher, CatalogStore, DepreciationValuationEngine,
    FuzzyCatalogMatcher, MatchResult, PriceFormatter, ValuationEngine,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::{Tool, ToolRegistry};

pub const SEARCH_CARS_BY_BUDGET: &str = "search_cars_by_budget";
pub const SEARCH_CAR_PRICE_BY_NAME: &str = "search_car_price_by_name";
pub const SEARCH_CAR_FEATURES: &str = "search_car_features";
pub const SEARCH_CARS_BY_COMPANY: &str = "search_cars_by_company";
pub const CALCULATE_USED_CAR_PRICE: &str = "calculate_used_car_price";
pub const GET_CAR_DETAILS: &str = "get_car_details";

/// Shared state behind every car tool.
pub struct CarToolContext {
    store: Arc<CatalogStore>,
    config: AppConfig,
    matcher: FuzzyCatalogMatcher,
    budget: BudgetRangeSearch,
    valuation: DepreciationValuationEngine,
    formatter: PriceFormatter,
}

impl CarToolContext {
    pub fn new(store: Arc<CatalogStore>, config: AppConfig) -> Self {
        Self {
            budget: BudgetRangeSearch::new(config.budget),
            valuation: DepreciationValuationEngine::new(config.valuation),
            formatter: PriceFormatter::from_kind(config.formatting.locale),
            matcher: FuzzyCatalogMatcher::new(),
            store,
            config,
        }
    }

    fn priced_entry(&self, listing: &CarListing, price: u64) -> PricedCar {
        PricedCar {
            car_name: listing.full_name.clone(),
            price,
            price_formatted: self.formatter.format(price),
        }
    }

    fn feature_matches(&self, results: Vec<MatchResult>) -> Value {
        let matches: Vec<FeatureMatch> = results
            .into_iter()
            .take(self.config.matching.max_results)
            .map(FeatureMatch::from)
            .collect();
        json!({ "success": true, "matches": matches })
    }
}

impl ToolRegistry {
    /// Registry holding the six catalog and valuation tools.
    pub fn car_toolkit(store: Arc<CatalogStore>, config: AppConfig) -> Self {
        let context = Arc::new(CarToolContext::new(store, config));
        let mut registry = Self::default();
        registry.register(SearchCarsByBudget(Arc::clone(&context)));
        registry.register(SearchCarPriceByName(Arc::clone(&context)));
        registry.register(SearchCarFeatures(Arc::clone(&context)));
        registry.register(SearchCarsByCompany(Arc::clone(&context)));
        registry.register(CalculateUsedCarPrice(Arc::clone(&context)));
        registry.register(GetCarDetails(context));
        registry
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricedCar {
    pub car_name: String,
    pub price: u64,
    pub price_formatted: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureMatch {
    pub company: String,
    pub car_name: String,
    pub full_name: String,
    pub technical_specs: String,
    pub advantages: String,
    pub disadvantages: String,
    pub score: f64,
    pub contains_match: bool,
}

impl From<MatchResult> for FeatureMatch {
    fn from(result: MatchResult) -> Self {
        let MatchResult { listing, score, contains_match } = result;
        Self {
            company: listing.brand,
            car_name: listing.model_name,
            full_name: listing.full_name,
            technical_specs: listing.technical_specs,
            advantages: listing.advantages,
            disadvantages: listing.disadvantages,
            score,
            contains_match,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input).with_context(|| format!("invalid arguments for `{tool}`"))
}

fn resolve_threshold(requested: Option<f64>, default: f64) -> Result<f64> {
    match requested {
        Some(value) if !(0.0..=1.0).contains(&value) => {
            bail!("`similarity_threshold` must be between 0 and 1, got {value}")
        }
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

pub struct SearchCarsByBudget(Arc<CarToolContext>);

#[derive(Deserialize)]
struct BudgetArgs {
    budget: u64,
}

#[async_trait]
impl Tool for SearchCarsByBudget {
    fn name(&self) -> &'static str {
        SEARCH_CARS_BY_BUDGET
    }

    fn description(&self) -> &'static str {
        "Lists cars priced from 10% below to 5% above the given budget, cheapest first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "budget": { "type": "integer", "minimum": 0, "description": "Budget in tomans" }
            },
            "required": ["budget"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: BudgetArgs = parse_args(self.name(), input)?;
        let context = &self.0;
        let catalog = context.store.snapshot();

        let cars: Vec<PricedCar> = context
            .budget
            .search_by_budget(&catalog, args.budget)
            .iter()
            .filter_map(|listing| listing.price.map(|price| context.priced_entry(listing, price)))
            .collect();
        Ok(serde_json::to_value(cars)?)
    }
}

pub struct SearchCarPriceByName(Arc<CarToolContext>);

#[derive(Deserialize)]
struct CarNameArgs {
    car_name: String,
    #[serde(default)]
    similarity_threshold: Option<f64>,
}

#[async_trait]
impl Tool for SearchCarPriceByName {
    fn name(&self) -> &'static str {
        SEARCH_CAR_PRICE_BY_NAME
    }

    fn description(&self) -> &'static str {
        "Finds current prices for cars whose name resembles or contains the given text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "car_name": { "type": "string", "description": "Full or partial car name" }
            },
            "required": ["car_name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: CarNameArgs = parse_args(self.name(), input)?;
        let context = &self.0;
        let threshold =
            resolve_threshold(args.similarity_threshold, context.config.matching.name_threshold)?;
        let catalog = context.store.snapshot();

        let cars: Vec<PricedCar> = context
            .matcher
            .match_by_name(&catalog, &args.car_name, threshold)
            .iter()
            .filter_map(|result| {
                result.listing.price.map(|price| context.priced_entry(&result.listing, price))
            })
            .take(context.config.matching.max_results)
            .collect();
        Ok(serde_json::to_value(cars)?)
    }
}

pub struct SearchCarFeatures(Arc<CarToolContext>);

#[async_trait]
impl Tool for SearchCarFeatures {
    fn name(&self) -> &'static str {
        SEARCH_CAR_FEATURES
    }

    fn description(&self) -> &'static str {
        "Returns technical specs, advantages and disadvantages for a car. Falls back to \
         searching the feature text itself when no car name matches."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "car_name": { "type": "string", "description": "Car name or feature keyword" },
                "similarity_threshold": { "type": "number", "minimum": 0, "maximum": 1 }
            },
            "required": ["car_name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: CarNameArgs = parse_args(self.name(), input)?;
        let context = &self.0;
        let matching = &context.config.matching;
        let query = args.car_name.as_str();
        let catalog = context.store.snapshot();

        let name_threshold =
            resolve_threshold(args.similarity_threshold, matching.feature_name_threshold)?;
        let by_name: Vec<MatchResult> = context
            .matcher
            .match_by_name(&catalog, query, name_threshold)
            .into_iter()
            .filter(|result| result.listing.has_features())
            .collect();
        if !by_name.is_empty() {
            return Ok(context.feature_matches(by_name));
        }

        let feature_threshold =
            resolve_threshold(args.similarity_threshold, matching.feature_threshold)?;
        let by_feature = context.matcher.match_by_feature(&catalog, query, feature_threshold);
        Ok(context.feature_matches(by_feature))
    }
}

pub struct SearchCarsByCompany(Arc<CarToolContext>);

#[derive(Deserialize)]
struct CompanyArgs {
    company_name: String,
    #[serde(default)]
    similarity_threshold: Option<f64>,
}

#[async_trait]
impl Tool for SearchCarsByCompany {
    fn name(&self) -> &'static str {
        SEARCH_CARS_BY_COMPANY
    }

    fn description(&self) -> &'static str {
        "Lists every car made by a company whose name resembles the given text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company_name": { "type": "string", "description": "Manufacturer name" },
                "similarity_threshold": { "type": "number", "minimum": 0, "maximum": 1 }
            },
            "required": ["company_name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: CompanyArgs = parse_args(self.name(), input)?;
        let context = &self.0;
        let query = args.company_name.as_str();
        let threshold = resolve_threshold(
            args.similarity_threshold,
            context.config.matching.company_threshold,
        )?;
        let catalog = context.store.snapshot();

        let matches = context.matcher.match_by_company(&catalog, query, threshold);
        Ok(context.feature_matches(matches))
    }
}

pub struct CalculateUsedCarPrice(Arc<CarToolContext>);

#[derive(Deserialize)]
struct ValuationArgs {
    base_price: Decimal,
    car_age: i64,
    car_kilometers: i64,
    #[serde(default)]
    damages: Vec<DamageRecord>,
    #[serde(flatten)]
    adjustments: MarketAdjustments,
}

#[async_trait]
impl Tool for CalculateUsedCarPrice {
    fn name(&self) -> &'static str {
        CALCULATE_USED_CAR_PRICE
    }

    fn description(&self) -> &'static str {
        "Estimates a used car's price from its new price, age, mileage and damage history."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "base_price": { "type": "number", "description": "Current new-car price" },
                "car_age": { "type": "integer", "minimum": 0, "description": "Age in years" },
                "car_kilometers": { "type": "integer", "minimum": 0 },
                "damages": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": {
                                "type": "string",
                                "enum": [
                                    "paint",
                                    "part_replacement",
                                    "body_replacement",
                                    "hood_replacement"
                                ]
                            },
                            "part": { "type": "string" },
                            "severity": { "type": "string", "enum": ["minor", "major"] }
                        },
                        "required": ["type"]
                    }
                },
                "options_factor": { "type": "number", "minimum": 0.9, "maximum": 1.1 },
                "brand_popularity": { "type": "number" },
                "market_factor": { "type": "number" }
            },
            "required": ["base_price", "car_age", "car_kilometers"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: ValuationArgs = parse_args(self.name(), input)?;
        let context = &self.0;

        let age_years = non_negative("car_age", args.car_age);
        let mileage_km = non_negative("car_kilometers", args.car_kilometers);

        let result = context.valuation.valuate(&DepreciationInput {
            base_price: args.base_price,
            age_years: u32::try_from(age_years).unwrap_or(u32::MAX),
            mileage_km,
            damages: args.damages,
            adjustments: args.adjustments,
        });

        let mut output = serde_json::to_value(&result)?;
        if let Value::Object(fields) = &mut output {
            fields.insert(
                "final_price_formatted".to_string(),
                Value::String(context.formatter.format_decimal(result.final_price)),
            );
            fields.insert(
                "price_range_formatted".to_string(),
                Value::String(result.price_range_text(&context.formatter)),
            );
        }
        Ok(output)
    }
}

pub struct GetCarDetails(Arc<CarToolContext>);

#[derive(Deserialize)]
struct DetailsArgs {
    car_name: String,
}

#[async_trait]
impl Tool for GetCarDetails {
    fn name(&self) -> &'static str {
        GET_CAR_DETAILS
    }

    fn description(&self) -> &'static str {
        "Returns the closest matching car with its full details, or similar names when \
         nothing matches closely."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "car_name": { "type": "string" }
            },
            "required": ["car_name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: DetailsArgs = parse_args(self.name(), input)?;
        let context = &self.0;
        let catalog = context.store.snapshot();

        let details =
            context.matcher.lookup_details(&catalog, &args.car_name, &context.config.matching);
        let price_formatted = match &details {
            CarDetails::Found { listing, .. } => {
                listing.price.map(|price| context.formatter.format(price))
            }
            CarDetails::NotFound { .. } => None,
        };

        let mut output = serde_json::to_value(&details)?;
        if let (Value::Object(fields), Some(formatted)) = (&mut output, price_formatted) {
            fields.insert("price_formatted".to_string(), Value::String(formatted));
        }
        Ok(output)
    }
}

/// Negative ages and odometer readings are treated as zero rather than rejected.
fn non_negative(field: &'static str, value: i64) -> u64 {
    if value < 0 {
        tracing::warn!(
            event_name = "agent.tool.argument_clamped",
            field,
            value,
            "negative valuation argument clamped to zero"
        );
        return 0;
    }
    value.unsigned_abs()
}
