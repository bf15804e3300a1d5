use tracing::{error, info, warn};

use super::Finder;
use super::catalog::location_hint;
use super::dedup::dedup_companies;
use super::query::{QueryBuilder, base_queries};
use super::types::{CompanySearchResult, CountrySearchResult, QueryRefinement, SearchReply};
use crate::backend::{Backend, OutputSchema};

impl<B: Backend> Finder<B> {
    /// One search pass over a country: a query per capability, run sequentially.
    pub async fn search_country(&self, country: &str) -> CountrySearchResult {
        self.run_pass(country, None).await
    }

    /// Runs one pass. With a refinement, its relevant names and extra
    /// instruction shape every query of the pass.
    pub(crate) async fn run_pass(
        &self,
        country: &str,
        refinement: Option<&QueryRefinement>,
    ) -> CountrySearchResult {
        info!(country, refined = refinement.is_some(), "starting company search");

        let location = location_hint(country);
        let schema = OutputSchema::of::<CompanySearchResult>("company_search_result");
        let builder = QueryBuilder::new(self.seed_company.as_deref(), self.config.max_context_names);
        let (relevant_names, extra_fragment): (&[String], &str) = match refinement {
            Some(r) => (&r.relevant_companies, &r.additional_query),
            None => (&[], ""),
        };

        let queries = base_queries(&self.capabilities, country);
        let total_searches = queries.len();
        let mut found_names: Vec<String> = Vec::new();
        let mut all_companies = Vec::new();
        let mut executed_queries = Vec::with_capacity(total_searches);
        let mut successful_searches = 0;

        for (i, base_query) in queries.iter().enumerate() {
            // Found names feed query construction from the second iteration on;
            // refinement context applies from the first.
            let prior_found: &[String] = if i > 0 { &found_names } else { &[] };
            let query = builder.build(base_query, prior_found, relevant_names, extra_fragment);
            info!(country, search = i + 1, total = total_searches, query = %query, "executing search");
            executed_queries.push(query.clone());

            match self.backend.search(&query, Some(&location), Some(&schema)).await {
                Ok(reply) => {
                    let companies = match SearchReply::from(reply) {
                        SearchReply::Structured(result) => result.companies,
                        SearchReply::RawFallback(raw) => {
                            warn!(country, search = i + 1, payload = %raw, "reply did not match company schema, counting zero companies");
                            Vec::new()
                        }
                    };
                    found_names.extend(
                        companies
                            .iter()
                            .filter(|c| !c.name.is_empty())
                            .map(|c| c.name.clone()),
                    );
                    successful_searches += 1;
                    info!(
                        country,
                        search = i + 1,
                        found = companies.len(),
                        running_total = all_companies.len() + companies.len(),
                        "search complete"
                    );
                    all_companies.extend(companies);
                }
                Err(e) => {
                    error!(country, search = i + 1, error = %e, "search failed, skipping");
                }
            }

            if i + 1 < total_searches {
                tokio::time::sleep(self.config.courtesy_delay).await;
            }
        }

        let companies = dedup_companies(all_companies);
        let total_found = companies.len();
        info!(
            country,
            total_found, successful_searches, total_searches, "country search finished"
        );

        CountrySearchResult {
            summary: format!(
                "Found {total_found} unique companies in {country} from {successful_searches}/{total_searches} successful searches"
            ),
            companies,
            total_found,
            search_queries_used: executed_queries,
            successful_searches,
            total_searches,
            deep_search: None,
        }
    }
}
