pub mod budget;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod format;
pub mod matcher;
pub mod similarity;
pub mod valuation;

pub use budget::{BudgetBand, BudgetRangeSearch};
pub use catalog::{Catalog, CatalogStore, CompanySummary, RawCarRecord};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::listing::CarListing;
pub use domain::valuation::{
    DamageKind, DamageRecord, DepreciationInput, MarketAdjustments, Severity, ValuationResult,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use format::{Magnitude, PriceFormatter, PriceLocale};
pub use matcher::{CarDetails, CatalogMatcher, FuzzyCatalogMatcher, MatchResult};
pub use similarity::{SequenceRatioScorer, TextSimilarityScorer};
pub use valuation::{DepreciationValuationEngine, ValuationEngine};
