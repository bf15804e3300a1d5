use std::collections::HashSet;

use super::types::Company;

/// Identity key for a company: trimmed and lowercased name.
pub fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Keeps the first record seen for each normalized name, in input order.
/// Records with a blank name are dropped.
pub fn dedup_companies(companies: impl IntoIterator<Item = Company>) -> Vec<Company> {
    let mut seen = HashSet::new();
    companies
        .into_iter()
        .filter(|company| {
            let key = normalized_name(&company.name);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}
