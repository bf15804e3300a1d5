use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{error, info};

use super::Finder;
use super::catalog::Region;
use super::dedup::dedup_companies;
use super::types::{
    CountryFailure, CountryOutcome, CountrySearchResult, FinderError, RegionSearchResult,
};
use crate::backend::Backend;

impl<B: Backend> Finder<B> {
    /// Searches every country of a region concurrently and merges the results.
    ///
    /// Countries are isolated from each other: a country that fails, panics,
    /// or outlives `deadline` becomes an error entry while the others keep
    /// their results. Without a deadline the call waits for every country.
    pub async fn search_region(
        &self,
        region: Region,
        deep_search: bool,
        deadline: Option<Duration>,
    ) -> RegionSearchResult {
        let countries = unique_countries(region.countries());
        info!(%region, countries = ?countries, deep_search, "starting region search");

        let outcomes = join_all(countries.iter().map(|country| async move {
            (country, self.country_outcome(country, deep_search, deadline).await)
        }))
        .await;

        let mut all_companies = Vec::new();
        let mut country_results = BTreeMap::new();
        let mut successful_countries = 0;
        let mut total_searches = 0;
        let mut total_successful_searches = 0;

        for (country, outcome) in outcomes {
            if let CountryOutcome::Completed(result) = &outcome {
                all_companies.extend(result.companies.iter().cloned());
                successful_countries += 1;
                total_searches += result.total_searches;
                total_successful_searches += result.successful_searches;
            }
            country_results.insert(country.to_string(), outcome);
        }

        let companies = dedup_companies(all_companies);
        let total_found = companies.len();
        let total_countries = countries.len();
        info!(
            %region,
            total_found, successful_countries, total_countries, "region search finished"
        );

        RegionSearchResult {
            region,
            summary: format!(
                "Found {total_found} unique companies across {successful_countries}/{total_countries} countries in {region} region. Total searches: {total_successful_searches}/{total_searches}"
            ),
            companies,
            total_found,
            countries_searched: countries.iter().map(|c| c.to_string()).collect(),
            successful_countries,
            total_countries,
            country_results,
            total_searches,
            total_successful_searches,
        }
    }

    /// Settles one country into the entry recorded for it: its result, or
    /// the flat error document when the search panicked or timed out.
    pub async fn country_outcome(
        &self,
        country: &str,
        deep_search: bool,
        deadline: Option<Duration>,
    ) -> CountryOutcome {
        match self.settle_country(country, deep_search, deadline).await {
            Ok(result) => {
                info!(country, found = result.total_found, "country search complete");
                CountryOutcome::Completed(result)
            }
            Err(e) => {
                error!(country, error = %e, "country search failed");
                CountryOutcome::Failed(CountryFailure::new(&e))
            }
        }
    }

    /// Plain or deep search of one country, bounded by an optional caller
    /// deadline, with panics caught and reported as errors.
    async fn settle_country(
        &self,
        country: &str,
        deep_search: bool,
        deadline: Option<Duration>,
    ) -> Result<CountrySearchResult, FinderError> {
        let search = async {
            if deep_search {
                self.deep_search_country(country).await
            } else {
                self.search_country(country).await
            }
        };
        let guarded = AssertUnwindSafe(search).catch_unwind();

        let outcome = match deadline {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| FinderError::Timeout(limit))?,
            None => guarded.await,
        };
        outcome.map_err(|panic| FinderError::TaskPanicked(panic_message(&*panic)))
    }
}

fn unique_countries(countries: &[&'static str]) -> Vec<&'static str> {
    let mut seen = HashSet::new();
    countries
        .iter()
        .copied()
        .filter(|c| seen.insert(*c))
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::finder::FinderConfig;
    use crate::finder::Company;
    use crate::finder::testing::{MockBackend, Scripted, refinement_reply};

    fn finder(backend: MockBackend, caps: &[&str]) -> Finder<MockBackend> {
        Finder::new(
            backend,
            Some(caps.iter().map(|c| c.to_string()).collect()),
            FinderConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn mena_searches_its_five_countries() {
        let finder = finder(MockBackend::new(), &["X"]);

        let result = finder.search_region(Region::Mena, false, None).await;

        assert_eq!(result.countries_searched, ["AE", "SA", "KW", "BH", "QA"]);
        assert_eq!(result.total_countries, 5);
        assert_eq!(result.country_results.len(), 5);
        for country in ["AE", "SA", "KW", "BH", "QA"] {
            assert_eq!(finder.backend().prompts_for(country).len(), 1, "{country}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_countries_are_isolated() {
        let backend = MockBackend::new()
            .finding("AE", &["Falcon", "Shared"])
            .on_search("SA", Scripted::Panic)
            .finding("KW", &["shared ", "Dhow"])
            .on_search("BH", Scripted::Panic)
            .on_search("QA", Scripted::Fail(BackendError::RateLimited));
        let finder = finder(backend, &["X"]);

        let result = finder.search_region(Region::Mena, false, None).await;

        assert_eq!(result.country_results.len(), 5);
        let failed = |c: &str| matches!(result.country_results[c], CountryOutcome::Failed(_));
        assert!(failed("SA"));
        assert!(failed("BH"));
        assert!(!failed("QA"));
        match &result.country_results["SA"] {
            CountryOutcome::Failed(failure) => {
                assert!(failure.error.contains("scripted backend panic"));
                assert!(failure.companies.is_empty());
                assert_eq!(failure.total_found, 0);
            }
            other => panic!("expected failure, got {other:?}"),
        }

        let names: Vec<&str> = result.companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Falcon", "Shared", "Dhow"]);
        assert_eq!(result.total_found, 3);
        assert_eq!(result.successful_countries, 3);
        assert_eq!(result.total_searches, 3);
        assert_eq!(result.total_successful_searches, 2);
        assert_eq!(
            result.summary,
            "Found 3 unique companies across 3/5 countries in MENA region. Total searches: 2/3"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_country_does_not_block_the_others_under_a_deadline() {
        let backend = MockBackend::new()
            .finding("JP", &["Sakura"])
            .on_search("KR", Scripted::Hang)
            .finding("CN", &["Dragon"]);
        let finder = finder(backend, &["X"]);

        let result = finder
            .search_region(Region::Asia, false, Some(Duration::from_secs(30)))
            .await;

        match &result.country_results["KR"] {
            CountryOutcome::Failed(failure) => assert!(failure.error.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(result.successful_countries, 2);
        let names: Vec<&str> = result.companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Sakura", "Dragon"]);
    }

    #[tokio::test(start_paused = true)]
    async fn countries_progress_concurrently() {
        let finder = finder(MockBackend::new(), &["X", "Y", "Z"]);

        let started = tokio::time::Instant::now();
        finder.search_region(Region::Asean, false, None).await;

        // Each country sleeps twice between its three searches; run
        // sequentially that would be twelve delays.
        assert_eq!(started.elapsed(), 2 * FinderConfig::default().courtesy_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn deep_region_search_merges_per_country() {
        let backend = MockBackend::new()
            .finding("JP", &["A", "B"])
            .finding("JP", &["C"])
            .on_reason_for("JP", Scripted::Reply(refinement_reply(&["A"], "Focus on JP.")))
            .finding("KR", &["Shared", "K1"])
            .finding("KR", &["K2"])
            .on_reason_for("KR", Scripted::Reply(refinement_reply(&["Shared"], "")))
            .finding("CN", &["C1"])
            .finding("CN", &["SHARED", "Dragon"])
            .on_reason_for("CN", Scripted::Reply(refinement_reply(&[], "")));
        let finder = finder(backend, &["X"]);

        let result = finder.search_region(Region::Asia, true, None).await;

        let completed = |c: &str| match &result.country_results[c] {
            CountryOutcome::Completed(r) => r.clone(),
            other => panic!("expected result for {c}, got {other:?}"),
        };
        fn names(companies: &[Company]) -> Vec<&str> {
            companies.iter().map(|c| c.name.as_str()).collect()
        }

        let jp = completed("JP");
        assert_eq!(names(&jp.companies), ["A", "C"]);
        let stats = jp.deep_search.as_ref().unwrap();
        assert_eq!(stats.initial_total_found, 2);
        assert_eq!(stats.refined_total_found, 1);
        assert_eq!(stats.relevant_companies, ["A"]);
        assert!(jp.search_queries_used[0].ends_with("Focus on JP."));

        assert_eq!(names(&completed("KR").companies), ["Shared", "K2"]);
        assert_eq!(names(&completed("CN").companies), ["SHARED", "Dragon"]);

        // Merged sets are deduplicated again across countries, in table order.
        assert_eq!(names(&result.companies), ["A", "C", "Shared", "K2", "Dragon"]);
        assert_eq!(result.total_found, 5);
        assert_eq!(result.successful_countries, 3);
        assert_eq!(finder.backend().reason_prompts().len(), 3);
        for country in ["JP", "KR", "CN"] {
            assert_eq!(finder.backend().prompts_for(country).len(), 2, "{country}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_country_settles_into_a_flat_error_entry() {
        let backend = MockBackend::new().on_search("GB", Scripted::Hang);
        let finder = finder(backend, &["X"]);

        let outcome = finder
            .country_outcome("GB", false, Some(Duration::from_secs(5)))
            .await;

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"error": "timed out after 5s", "companies": [], "total_found": 0})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finished_country_settles_into_its_result() {
        let backend = MockBackend::new().finding("GB", &["Acme"]);
        let finder = finder(backend, &["X"]);

        match finder.country_outcome("GB", false, Some(Duration::from_secs(5))).await {
            CountryOutcome::Completed(result) => assert_eq!(result.total_found, 1),
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn unique_countries_preserves_order() {
        assert_eq!(unique_countries(&["GB", "DE", "GB", "FR"]), ["GB", "DE", "FR"]);
    }
}
