use serde::{Deserialize, Serialize};

/// One catalog entry. Built only through [`CarListing::new`] so `full_name` always
/// follows from `brand` and `model_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarListing {
    pub brand: String,
    pub model_name: String,
    pub full_name: String,
    pub price: Option<u64>,
    pub technical_specs: String,
    pub advantages: String,
    pub disadvantages: String,
}

impl CarListing {
    pub fn new(brand: &str, model_name: &str, price: Option<u64>) -> Self {
        let brand = collapse_whitespace(brand);
        let model_name = collapse_whitespace(model_name);
        let full_name = full_name_of(&brand, &model_name);
        Self {
            brand,
            model_name,
            full_name,
            price,
            technical_specs: String::new(),
            advantages: String::new(),
            disadvantages: String::new(),
        }
    }

    pub fn with_features(
        mut self,
        technical_specs: &str,
        advantages: &str,
        disadvantages: &str,
    ) -> Self {
        self.technical_specs = technical_specs.trim().to_string();
        self.advantages = advantages.trim().to_string();
        self.disadvantages = disadvantages.trim().to_string();
        self
    }

    pub fn has_features(&self) -> bool {
        !(self.technical_specs.is_empty()
            && self.advantages.is_empty()
            && self.disadvantages.is_empty())
    }
}

/// Brand and model joined by a single space. An empty brand yields the bare model name.
pub fn full_name_of(brand: &str, model_name: &str) -> String {
    let joined = format!("{} {}", brand.trim(), model_name.trim());
    collapse_whitespace(&joined)
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{full_name_of, CarListing};

    #[test]
    fn full_name_is_derived_from_brand_and_model() {
        let listing = CarListing::new("  Iran Khodro ", "Dena   Plus", Some(1));
        assert_eq!(listing.brand, "Iran Khodro");
        assert_eq!(listing.model_name, "Dena Plus");
        assert_eq!(listing.full_name, "Iran Khodro Dena Plus");
    }

    #[test]
    fn empty_brand_leaves_model_name_only() {
        assert_eq!(full_name_of("", "Tiba 2"), "Tiba 2");
    }

    #[test]
    fn rebuilding_a_listing_is_idempotent() {
        let first = CarListing::new("Saipa", "Shahin", None);
        let second = CarListing::new(&first.brand, &first.model_name, first.price);
        assert_eq!(first, second);
    }
}
