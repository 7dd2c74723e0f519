use std::cmp::Ordering;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::MatchingConfig;
use crate::domain::listing::CarListing;
use crate::similarity::{normalize, SequenceRatioScorer, TextSimilarityScorer};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub listing: CarListing,
    pub score: f64,
    pub contains_match: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CarDetails {
    Found { listing: CarListing, score: f64, alternatives: Vec<MatchResult> },
    NotFound { query: String, suggestions: Vec<String> },
}

/// Ranked fuzzy lookups over a catalog snapshot.
///
/// Every lookup returns results sorted by `(contains_match desc, score desc)` with
/// catalog order breaking ties. Blank queries return nothing.
pub trait CatalogMatcher: Send + Sync {
    fn match_by_name(&self, catalog: &Catalog, query: &str, threshold: f64) -> Vec<MatchResult>;

    fn match_by_company(&self, catalog: &Catalog, query: &str, threshold: f64)
        -> Vec<MatchResult>;

    fn match_by_feature(&self, catalog: &Catalog, keyword: &str, threshold: f64)
        -> Vec<MatchResult>;

    /// Best name match for `query`, or close full names the caller can offer instead.
    fn lookup_details(
        &self,
        catalog: &Catalog,
        query: &str,
        config: &MatchingConfig,
    ) -> CarDetails {
        let mut matches = self.match_by_name(catalog, query, config.details_threshold);
        if matches.is_empty() {
            let suggestions = self
                .match_by_name(catalog, query, config.suggestion_threshold)
                .into_iter()
                .take(config.suggestion_limit)
                .map(|candidate| candidate.listing.full_name)
                .collect();
            return CarDetails::NotFound { query: query.trim().to_string(), suggestions };
        }

        let best = matches.remove(0);
        matches.truncate(config.suggestion_limit);
        CarDetails::Found { listing: best.listing, score: best.score, alternatives: matches }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FuzzyCatalogMatcher<S = SequenceRatioScorer> {
    scorer: S,
}

impl FuzzyCatalogMatcher<SequenceRatioScorer> {
    pub fn new() -> Self {
        Self { scorer: SequenceRatioScorer::new() }
    }
}

impl<S: TextSimilarityScorer> FuzzyCatalogMatcher<S> {
    pub fn with_scorer(scorer: S) -> Self {
        Self { scorer }
    }

    fn rank<'a, F>(
        &self,
        catalog: &'a Catalog,
        query: &str,
        threshold: f64,
        fields: F,
    ) -> Vec<MatchResult>
    where
        F: Fn(&'a CarListing) -> Vec<&'a str>,
    {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for listing in catalog.listings() {
            let mut best: Option<f64> = None;
            let mut contains_match = false;

            for field in fields(listing) {
                let field = normalize(field);
                if field.is_empty() {
                    continue;
                }

                let score = self.scorer.score(&query, &field);
                best = Some(best.map_or(score, |current| current.max(score)));
                contains_match |= field.contains(&query) || query.contains(&field);
            }

            let Some(score) = best else {
                continue;
            };
            if score >= threshold || contains_match {
                results.push(MatchResult { listing: listing.clone(), score, contains_match });
            }
        }

        sort_results(&mut results);
        tracing::debug!(
            event_name = "matcher.rank.completed",
            query = %query,
            threshold,
            matches = results.len(),
            "catalog match ranked"
        );
        results
    }
}

impl<S: TextSimilarityScorer> CatalogMatcher for FuzzyCatalogMatcher<S> {
    fn match_by_name(&self, catalog: &Catalog, query: &str, threshold: f64) -> Vec<MatchResult> {
        self.rank(catalog, query, threshold, |listing| {
            vec![listing.full_name.as_str(), listing.model_name.as_str(), listing.brand.as_str()]
        })
    }

    fn match_by_company(
        &self,
        catalog: &Catalog,
        query: &str,
        threshold: f64,
    ) -> Vec<MatchResult> {
        self.rank(catalog, query, threshold, |listing| vec![listing.brand.as_str()])
    }

    fn match_by_feature(
        &self,
        catalog: &Catalog,
        keyword: &str,
        threshold: f64,
    ) -> Vec<MatchResult> {
        self.rank(catalog, keyword, threshold, |listing| {
            vec![
                listing.technical_specs.as_str(),
                listing.advantages.as_str(),
                listing.disadvantages.as_str(),
            ]
        })
    }
}

/// Stable sort, so equal keys keep catalog order.
pub fn sort_results(results: &mut [MatchResult]) {
    results.sort_by(|left, right| match right.contains_match.cmp(&left.contains_match) {
        Ordering::Equal => right.score.total_cmp(&left.score),
        other => other,
    });
}

#[cfg(test)]
mod tests {
    use super::{CarDetails, CatalogMatcher, FuzzyCatalogMatcher, MatchResult};
    use crate::catalog::Catalog;
    use crate::config::MatchingConfig;
    use crate::domain::listing::CarListing;
    use crate::similarity::TextSimilarityScorer;

    struct AlwaysSimilar;

    impl TextSimilarityScorer for AlwaysSimilar {
        fn score(&self, _a: &str, _b: &str) -> f64 {
            1.0
        }
    }

    fn fixture() -> Catalog {
        Catalog::from_listings(vec![
            CarListing::new("Iran Khodro", "Dena Plus", Some(950_000_000)).with_features(
                "1.7L turbo engine, 6-speed automatic",
                "strong acceleration, spacious cabin",
                "high fuel consumption",
            ),
            CarListing::new("Saipa", "Shahin", Some(780_000_000)).with_features(
                "1.5L engine, CVT gearbox",
                "affordable spare parts",
                "weak build quality",
            ),
            CarListing::new("Iran Khodro", "Peugeot 207", Some(890_000_000)),
            CarListing::new("", "Haval H6", None),
            CarListing::new("Saipa", "Tiba 2", Some(520_000_000)),
        ])
    }

    fn names(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|result| result.listing.full_name.as_str()).collect()
    }

    #[test]
    fn blank_query_returns_nothing() {
        let matcher = FuzzyCatalogMatcher::new();
        let catalog = fixture();
        assert!(matcher.match_by_name(&catalog, "", 0.0).is_empty());
        assert!(matcher.match_by_name(&catalog, "   ", 0.0).is_empty());
        assert!(matcher.match_by_company(&catalog, "\t", 0.0).is_empty());
        assert!(matcher.match_by_feature(&catalog, "", 0.0).is_empty());
    }

    #[test]
    fn custom_scorer_drives_ranking() {
        let catalog = fixture();
        assert!(FuzzyCatalogMatcher::new().match_by_name(&catalog, "zzz", 0.99).is_empty());

        let results =
            FuzzyCatalogMatcher::with_scorer(AlwaysSimilar).match_by_name(&catalog, "zzz", 0.99);
        assert_eq!(
            names(&results),
            vec![
                "Iran Khodro Dena Plus",
                "Saipa Shahin",
                "Iran Khodro Peugeot 207",
                "Haval H6",
                "Saipa Tiba 2",
            ]
        );
        assert!(results.iter().all(|result| !result.contains_match));
    }

    #[test]
    fn exact_full_name_ranks_first_with_containment() {
        let matcher = FuzzyCatalogMatcher::new();
        let results = matcher.match_by_name(&fixture(), "Iran Khodro Peugeot 207", 0.6);

        assert_eq!(results[0].listing.full_name, "Iran Khodro Peugeot 207");
        assert!(results[0].contains_match);
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_name_qualifies_through_containment() {
        let matcher = FuzzyCatalogMatcher::new();
        let results = matcher.match_by_name(&fixture(), "dena", 0.6);

        assert_eq!(names(&results), vec!["Iran Khodro Dena Plus"]);
        assert!(results[0].contains_match);
    }

    #[test]
    fn brand_query_returns_all_company_listings_in_catalog_order() {
        let matcher = FuzzyCatalogMatcher::new();
        let results = matcher.match_by_name(&fixture(), "saipa", 0.6);

        assert_eq!(names(&results), vec!["Saipa Shahin", "Saipa Tiba 2"]);
        assert!(results.iter().all(|result| result.contains_match));
    }

    #[test]
    fn empty_brand_never_counts_as_containment() {
        let matcher = FuzzyCatalogMatcher::new();
        let results = matcher.match_by_company(&fixture(), "haval", 0.4);
        assert!(names(&results).iter().all(|name| *name != "Haval H6"));
    }

    #[test]
    fn containment_outranks_higher_fuzzy_score() {
        let matcher = FuzzyCatalogMatcher::new();
        let catalog = Catalog::from_listings(vec![
            CarListing::new("", "Tibb", None),
            CarListing::new("Saipa", "Tiba 2 Hatchback", None),
        ]);

        let results = matcher.match_by_name(&catalog, "tiba", 0.5);
        assert_eq!(names(&results), vec!["Saipa Tiba 2 Hatchback", "Tibb"]);
        assert!(results[0].contains_match);
        assert!(!results[1].contains_match);
        assert!(results[1].score > results[0].score);
    }

    #[test]
    fn company_search_uses_its_own_threshold() {
        let matcher = FuzzyCatalogMatcher::new();
        let catalog = fixture();

        let loose = matcher.match_by_company(&catalog, "Iran Khodr", 0.4);
        assert_eq!(names(&loose), vec!["Iran Khodro Dena Plus", "Iran Khodro Peugeot 207"]);

        let strict = matcher.match_by_company(&catalog, "Saypa", 0.99);
        assert!(strict.is_empty());
    }

    #[test]
    fn feature_search_matches_specs_pros_and_cons() {
        let matcher = FuzzyCatalogMatcher::new();
        let catalog = fixture();

        let turbo = matcher.match_by_feature(&catalog, "turbo", 0.3);
        assert_eq!(names(&turbo), vec!["Iran Khodro Dena Plus"]);

        let parts = matcher.match_by_feature(&catalog, "Spare Parts", 0.3);
        assert_eq!(names(&parts)[0], "Saipa Shahin");
        assert!(parts[0].contains_match);
    }

    #[test]
    fn listings_without_feature_text_are_skipped_even_at_zero_threshold() {
        let matcher = FuzzyCatalogMatcher::new();
        let results = matcher.match_by_feature(&fixture(), "engine", 0.0);
        let mut found = names(&results);
        found.sort_unstable();
        assert_eq!(found, vec!["Iran Khodro Dena Plus", "Saipa Shahin"]);
    }

    #[test]
    fn results_are_sorted_and_deterministic() {
        let matcher = FuzzyCatalogMatcher::new();
        let catalog = fixture();
        let first = matcher.match_by_name(&catalog, "iran", 0.1);
        let second = matcher.match_by_name(&catalog, "iran", 0.1);
        assert_eq!(first, second);

        for pair in first.windows(2) {
            let ordered = pair[0].contains_match > pair[1].contains_match
                || (pair[0].contains_match == pair[1].contains_match
                    && pair[0].score >= pair[1].score);
            assert!(ordered, "results out of order");
        }
    }

    #[test]
    fn details_lookup_returns_best_match_with_alternatives() {
        let matcher = FuzzyCatalogMatcher::new();
        let details = matcher.lookup_details(&fixture(), "shahin", &MatchingConfig::default());

        match details {
            CarDetails::Found { listing, alternatives, .. } => {
                assert_eq!(listing.full_name, "Saipa Shahin");
                assert!(alternatives.len() <= MatchingConfig::default().suggestion_limit);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn details_lookup_offers_suggestions_when_nothing_matches() {
        let matcher = FuzzyCatalogMatcher::new();
        let config = MatchingConfig { details_threshold: 0.95, ..MatchingConfig::default() };
        let details = matcher.lookup_details(&fixture(), "Tibah", &config);

        match details {
            CarDetails::NotFound { query, suggestions } => {
                assert_eq!(query, "Tibah");
                assert!(suggestions.contains(&"Saipa Tiba 2".to_string()));
            }
            other => panic!("expected suggestions, got {other:?}"),
        }
    }
}
