use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::BudgetConfig;
use crate::domain::listing::CarListing;

/// Inclusive price window derived from a budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetBand {
    pub min_price: u64,
    pub max_price: u64,
}

impl BudgetBand {
    pub fn contains(&self, price: u64) -> bool {
        (self.min_price..=self.max_price).contains(&price)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BudgetRangeSearch {
    config: BudgetConfig,
}

impl BudgetRangeSearch {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// `[floor(budget * (1 - lower)), floor(budget * (1 + upper))]`, saturating at `u64::MAX`.
    pub fn band(&self, budget: u64) -> BudgetBand {
        let budget = Decimal::from(budget);
        let scaled = |factor: Decimal| {
            budget.checked_mul(factor).and_then(|value| value.floor().to_u64()).unwrap_or(u64::MAX)
        };

        BudgetBand {
            min_price: scaled(Decimal::ONE - self.config.lower_tolerance),
            max_price: scaled(Decimal::ONE + self.config.upper_tolerance),
        }
    }

    /// Priced listings inside the budget band, cheapest first. Equal prices keep
    /// catalog order.
    pub fn search_by_budget(&self, catalog: &Catalog, budget: u64) -> Vec<CarListing> {
        if budget == 0 {
            tracing::debug!(
                event_name = "budget.search.zero_budget",
                "zero budget matches nothing"
            );
            return Vec::new();
        }

        let band = self.band(budget);
        let mut matches: Vec<CarListing> = catalog
            .listings()
            .iter()
            .filter(|listing| listing.price.is_some_and(|price| band.contains(price)))
            .cloned()
            .collect();
        matches.sort_by_key(|listing| listing.price);

        tracing::debug!(
            event_name = "budget.search.completed",
            budget,
            min_price = band.min_price,
            max_price = band.max_price,
            matches = matches.len(),
            "budget search completed"
        );
        matches
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{BudgetBand, BudgetRangeSearch};
    use crate::catalog::Catalog;
    use crate::config::BudgetConfig;
    use crate::domain::listing::CarListing;

    fn prices(listings: &[CarListing]) -> Vec<u64> {
        listings.iter().filter_map(|listing| listing.price).collect()
    }

    #[test]
    fn default_band_is_ten_percent_below_and_five_above() {
        let search = BudgetRangeSearch::default();
        assert_eq!(
            search.band(1_000_000),
            BudgetBand { min_price: 900_000, max_price: 1_050_000 }
        );
    }

    #[test]
    fn band_floors_fractional_bounds() {
        let search = BudgetRangeSearch::default();
        assert_eq!(search.band(999), BudgetBand { min_price: 899, max_price: 1048 });
    }

    #[test]
    fn band_saturates_instead_of_overflowing() {
        let search = BudgetRangeSearch::default();
        assert_eq!(search.band(u64::MAX).max_price, u64::MAX);
    }

    #[test]
    fn bounds_are_inclusive_and_results_ascending() {
        let catalog = Catalog::from_listings(vec![
            CarListing::new("A", "Over", Some(1_050_001)),
            CarListing::new("A", "Top", Some(1_050_000)),
            CarListing::new("A", "Mid", Some(950_000)),
            CarListing::new("A", "Unpriced", None),
            CarListing::new("A", "Bottom", Some(900_000)),
            CarListing::new("A", "Under", Some(899_999)),
        ]);

        let results = BudgetRangeSearch::default().search_by_budget(&catalog, 1_000_000);
        assert_eq!(prices(&results), vec![900_000, 950_000, 1_050_000]);
    }

    #[test]
    fn upper_bound_excludes_more_than_five_percent_over() {
        let catalog = Catalog::from_listings(vec![
            CarListing::new("Saipa", "Shahin", Some(530_000_000)),
            CarListing::new("Iran Khodro", "Tara", Some(480_000_000)),
        ]);

        let results = BudgetRangeSearch::default().search_by_budget(&catalog, 500_000_000);
        assert_eq!(prices(&results), vec![480_000_000]);
    }

    #[test]
    fn equal_prices_keep_catalog_order() {
        let catalog = Catalog::from_listings(vec![
            CarListing::new("B", "Second", Some(100)),
            CarListing::new("A", "First", Some(100)),
        ]);

        let results = BudgetRangeSearch::default().search_by_budget(&catalog, 100);
        assert_eq!(results[0].model_name, "Second");
        assert_eq!(results[1].model_name, "First");
    }

    #[test]
    fn nothing_in_range_is_an_empty_list() {
        let catalog = Catalog::from_listings(vec![CarListing::new("A", "Cheap", Some(10))]);
        let search = BudgetRangeSearch::default();
        assert!(search.search_by_budget(&catalog, 1_000_000).is_empty());
        assert!(search.search_by_budget(&catalog, 0).is_empty());
    }

    #[test]
    fn tolerance_is_configurable() {
        let search = BudgetRangeSearch::new(BudgetConfig {
            lower_tolerance: Decimal::new(5, 2),
            upper_tolerance: Decimal::new(10, 2),
        });
        assert_eq!(
            search.band(1_000_000),
            BudgetBand { min_price: 950_000, max_price: 1_100_000 }
        );
    }
}
