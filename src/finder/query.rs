/// One base query per capability, in capability order.
pub fn base_queries(capabilities: &[String], country: &str) -> Vec<String> {
    capabilities
        .iter()
        .map(|capability| format!("Companies in {country} that are related to {capability}"))
        .collect()
}

/// Builds the query actually sent for one search iteration.
///
/// Context is applied in strict priority order: names already found in this
/// pass, then names a refinement marked relevant, then the seed company.
/// The refinement's extra instruction is appended whichever branch applies.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    seed_company: Option<&'a str>,
    max_context_names: usize,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(seed_company: Option<&'a str>, max_context_names: usize) -> Self {
        Self {
            seed_company: seed_company.filter(|s| !s.trim().is_empty()),
            max_context_names,
        }
    }

    pub fn build(
        &self,
        base_query: &str,
        found_names: &[String],
        relevant_names: &[String],
        extra_fragment: &str,
    ) -> String {
        let mut query = if !found_names.is_empty() {
            let shown = &found_names[..found_names.len().min(self.max_context_names)];
            let already_found = shown.join(", ");
            match self.seed_company {
                Some(seed) => format!(
                    "{base_query}. Find companies similar to {seed} but NOT including these already found: {already_found}. Do not repeat any of these companies."
                ),
                None => format!(
                    "{base_query}. NOT including these already found: {already_found}. Do not repeat any of these companies."
                ),
            }
        } else if !relevant_names.is_empty() {
            format!(
                "{base_query}. Find companies similar to these: {}. Do not repeat any of these companies.",
                relevant_names.join(", ")
            )
        } else if let Some(seed) = self.seed_company {
            format!("{base_query}. Find companies similar to {seed}.")
        } else {
            base_query.to_string()
        };

        let extra = extra_fragment.trim();
        if !extra.is_empty() {
            query.push(' ');
            query.push_str(extra);
        }
        query
    }
}
