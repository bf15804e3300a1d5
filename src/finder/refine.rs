use std::collections::HashSet;

use tracing::{error, info};

use super::Finder;
use super::dedup::dedup_companies;
use super::types::{CountrySearchResult, DeepSearchStats, QueryRefinement, decode};
use crate::backend::{Backend, OutputSchema};

impl<B: Backend> Finder<B> {
    /// Asks the backend which companies of a previous pass are relevant and
    /// what to add to the next pass's queries. Failures yield an empty refinement.
    pub async fn refine_query(&self, previous: &CountrySearchResult) -> QueryRefinement {
        let prompt = serde_json::to_string_pretty(previous)
            .unwrap_or_else(|_| format!("{previous:?}"));
        let schema = OutputSchema::of::<QueryRefinement>("query_refinement");

        let outcome = match self.backend.reason(&prompt, &schema).await {
            Ok(reply) => decode::<QueryRefinement>(reply),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(refinement) => {
                info!(
                    additional_query = %refinement.additional_query,
                    relevant_companies = ?refinement.relevant_companies,
                    "refinement produced"
                );
                refinement
            }
            Err(e) => {
                error!(error = %e, "query refinement failed, continuing unrefined");
                QueryRefinement::default()
            }
        }
    }

    /// Two-phase search of one country: an initial pass, a refinement of
    /// its results, and a refined pass. The result keeps the initial pass's
    /// relevant companies followed by everything the refined pass found.
    pub async fn deep_search_country(&self, country: &str) -> CountrySearchResult {
        info!(country, "deep search: initial pass");
        let initial = self.run_pass(country, None).await;

        info!(country, found = initial.total_found, "deep search: refining queries");
        let refinement = self.refine_query(&initial).await;

        info!(country, "deep search: refined pass");
        let refined = self.run_pass(country, Some(&refinement)).await;

        merge_deep_search(country, initial, refinement, refined)
    }
}

fn merge_deep_search(
    country: &str,
    initial: CountrySearchResult,
    refinement: QueryRefinement,
    refined: CountrySearchResult,
) -> CountrySearchResult {
    let relevant: HashSet<&str> = refinement
        .relevant_companies
        .iter()
        .map(String::as_str)
        .collect();
    let retained = initial
        .companies
        .into_iter()
        .filter(|c| relevant.contains(c.name.as_str()));
    let companies = dedup_companies(retained.chain(refined.companies));
    let total_found = companies.len();

    info!(
        country,
        total_found,
        initial = initial.total_found,
        refined = refined.total_found,
        "deep search finished"
    );

    CountrySearchResult {
        summary: format!(
            "Deep search found {total_found} unique companies in {country} after refinement. (Initial pass: {}, refined pass: {} before merge)",
            initial.total_found, refined.total_found
        ),
        companies,
        total_found,
        deep_search: Some(DeepSearchStats {
            initial_total_found: initial.total_found,
            refined_total_found: refined.total_found,
            relevant_companies: refinement.relevant_companies,
            additional_query: refinement.additional_query,
        }),
        ..refined
    }
}
