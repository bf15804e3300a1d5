use tracing::{error, info};

use super::types::{CompanyCapabilities, decode};
use crate::backend::{Backend, OutputSchema};

const MAX_CAPABILITIES: usize = 5;

fn profile_prompt(company_name: &str) -> String {
    format!(
        r#"Analyze the company "{company_name}" and determine which capabilities it possesses.

Assumptions about the company:
- The company operates in military, social media analytics, and/or tech-related domains
- It likely provides services or products related to defense, social media analysis, or technology solutions

Research this company online and determine:
1. What specific services or products does this company offer?
2. Which capabilities from the target list does the company possess based on their business focus, services, or expertise?

Only include capabilities that you are reasonably confident the company actually possesses based on available information."#
    )
}

/// Asks the backend what a company does and which capabilities describe it.
///
/// Never fails: a backend or schema error yields an empty profile.
pub async fn profile_company(backend: &impl Backend, company_name: &str) -> CompanyCapabilities {
    info!(company = company_name, "profiling company capabilities");
    let schema = OutputSchema::of::<CompanyCapabilities>("company_capabilities");

    let outcome = match backend
        .search(&profile_prompt(company_name), None, Some(&schema))
        .await
    {
        Ok(reply) => decode::<CompanyCapabilities>(reply),
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(mut profile) => {
            profile
                .identified_capabilities
                .retain(|c| !c.trim().is_empty());
            profile.identified_capabilities.truncate(MAX_CAPABILITIES);
            info!(
                company = company_name,
                capabilities = profile.identified_capabilities.len(),
                "capabilities identified"
            );
            profile
        }
        Err(e) => {
            error!(company = company_name, error = %e, "capability profiling failed");
            CompanyCapabilities::default()
        }
    }
}
