pub mod source;

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::listing::CarListing;

/// One record as it arrives from an external catalog file, before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCarRecord {
    #[serde(default, alias = "company")]
    pub brand: Option<String>,
    #[serde(default, alias = "car_name", alias = "name")]
    pub model_name: Option<String>,
    /// Brand-prefixed name some scrapers emit next to `car_name`.
    #[serde(default)]
    pub full_car_name: Option<String>,
    #[serde(default, alias = "current_price")]
    pub price: Option<Value>,
    #[serde(default)]
    pub technical_specs: Option<String>,
    #[serde(default)]
    pub advantages: Option<String>,
    #[serde(default)]
    pub disadvantages: Option<String>,
}

/// Immutable snapshot of the car catalog. Listing order is the source order and acts as
/// the final tie-break wherever results are ranked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    listings: Vec<CarListing>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompanySummary {
    pub company: String,
    pub listings: usize,
    pub priced: usize,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

impl Catalog {
    pub fn from_listings(listings: Vec<CarListing>) -> Self {
        Self { listings }
    }

    pub fn listings(&self) -> &[CarListing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn priced_len(&self) -> usize {
        self.listings.iter().filter(|listing| listing.price.is_some()).count()
    }

    /// Distinct non-empty brands in first-seen order.
    pub fn companies(&self) -> Vec<&str> {
        let mut companies: Vec<&str> = Vec::new();
        for listing in &self.listings {
            let brand = listing.brand.as_str();
            if !brand.is_empty() && !companies.contains(&brand) {
                companies.push(brand);
            }
        }
        companies
    }

    pub fn summary(&self) -> Vec<CompanySummary> {
        let mut summaries: Vec<CompanySummary> = Vec::new();
        for listing in &self.listings {
            let position = summaries.iter().position(|entry| entry.company == listing.brand);
            let entry = match position {
                Some(index) => &mut summaries[index],
                None => {
                    summaries.push(CompanySummary {
                        company: listing.brand.clone(),
                        listings: 0,
                        priced: 0,
                        min_price: None,
                        max_price: None,
                    });
                    let last = summaries.len() - 1;
                    &mut summaries[last]
                }
            };

            entry.listings += 1;
            if let Some(price) = listing.price {
                entry.priced += 1;
                entry.min_price = Some(entry.min_price.map_or(price, |current| current.min(price)));
                entry.max_price = Some(entry.max_price.map_or(price, |current| current.max(price)));
            }
        }
        summaries
    }
}

fn resolve_model_name(record: &RawCarRecord) -> &str {
    let model_name = record.model_name.as_deref().map(str::trim).unwrap_or_default();
    if !model_name.is_empty() {
        return model_name;
    }

    let full_name = record.full_car_name.as_deref().map(str::trim).unwrap_or_default();
    let brand = record.brand.as_deref().map(str::trim).unwrap_or_default();
    if brand.is_empty() {
        return full_name;
    }
    full_name.strip_prefix(brand).map(str::trim_start).unwrap_or(full_name)
}

/// Builds a catalog from raw records. Records without a model name are dropped and
/// unparsable prices become `None`; neither aborts the load.
pub fn load(records: Vec<RawCarRecord>) -> Catalog {
    let total = records.len();
    let mut listings = Vec::with_capacity(total);

    for (index, record) in records.into_iter().enumerate() {
        let model_name = resolve_model_name(&record);
        if model_name.is_empty() {
            tracing::warn!(
                event_name = "catalog.load.record_skipped",
                index,
                reason = "missing model name",
                "skipping catalog record"
            );
            continue;
        }

        let price = match &record.price {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = source::parse_price_value(value);
                if parsed.is_none() {
                    tracing::debug!(
                        event_name = "catalog.load.price_unparsed",
                        index,
                        raw_price = %value,
                        "price could not be parsed, keeping listing without price"
                    );
                }
                parsed
            }
        };

        let brand = record.brand.as_deref().unwrap_or_default();
        let listing = CarListing::new(brand, model_name, price).with_features(
            record.technical_specs.as_deref().unwrap_or_default(),
            record.advantages.as_deref().unwrap_or_default(),
            record.disadvantages.as_deref().unwrap_or_default(),
        );
        listings.push(listing);
    }

    tracing::info!(
        event_name = "catalog.load.completed",
        total_records = total,
        loaded = listings.len(),
        skipped = total - listings.len(),
        "catalog loaded"
    );

    Catalog::from_listings(listings)
}

/// Holds the current catalog snapshot. Readers take an `Arc` and keep a consistent view
/// even if a refresh swaps in a new snapshot while they are working.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self { current: RwLock::new(Arc::new(catalog)) }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Installs `catalog` as the current snapshot and returns the previous one.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}
