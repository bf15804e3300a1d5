//! Search orchestration: capability-driven query construction, per-country
//! search passes, two-phase deep search, and concurrent region fan-out.

pub mod catalog;
pub mod dedup;
mod profile;
pub mod query;
mod refine;
mod region;
mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

use std::time::Duration;

use tracing::{info, warn};

pub use catalog::Region;
pub use profile::profile_company;
pub use types::{Company, CountryOutcome, RegionSearchResult};

use crate::backend::Backend;

/// Tuning knobs for a search run.
#[derive(Debug, Clone, Copy)]
pub struct FinderConfig {
    /// Pause between consecutive searches of one pass.
    pub courtesy_delay: Duration,
    /// Cap on already-found names echoed back into a query.
    pub max_context_names: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            courtesy_delay: Duration::from_secs(1),
            max_context_names: 20,
        }
    }
}

/// Finds companies matching a capability profile.
///
/// Capabilities and seed company are fixed at construction and shared
/// read-only by every search issued through the finder. Refinement output
/// is never stored here; it is threaded through each deep search call.
pub struct Finder<B> {
    backend: B,
    capabilities: Vec<String>,
    seed_company: Option<String>,
    seed_description: Option<String>,
    config: FinderConfig,
}

impl<B: Backend> Finder<B> {
    /// Finder over explicit capabilities; `None` or an empty list selects the defaults.
    pub fn new(backend: B, capabilities: Option<Vec<String>>, config: FinderConfig) -> Self {
        Self {
            backend,
            capabilities: capabilities_or_default(capabilities),
            seed_company: None,
            seed_description: None,
            config,
        }
    }

    /// Finder seeded from a company: its capabilities are profiled once up
    /// front. If profiling yields nothing, `fallback` (or the defaults) is used.
    pub async fn with_seed_company(
        backend: B,
        seed_company: &str,
        fallback: Option<Vec<String>>,
        config: FinderConfig,
    ) -> Self {
        let profile = profile_company(&backend, seed_company).await;
        let capabilities = if profile.identified_capabilities.is_empty() {
            warn!(seed_company, "no capabilities profiled, using fallback list");
            capabilities_or_default(fallback)
        } else {
            profile.identified_capabilities
        };
        info!(seed_company, ?capabilities, "finder seeded");
        Self {
            backend,
            capabilities,
            seed_company: Some(seed_company.to_string()),
            seed_description: Some(profile.description).filter(|d| !d.is_empty()),
            config,
        }
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn seed_company(&self) -> Option<&str> {
        self.seed_company.as_deref()
    }

    pub fn seed_description(&self) -> Option<&str> {
        self.seed_description.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }
}

fn capabilities_or_default(capabilities: Option<Vec<String>>) -> Vec<String> {
    capabilities
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| {
            catalog::DEFAULT_CAPABILITIES
                .iter()
                .map(|c| c.to_string())
                .collect()
        })
}

#[cfg(test)]
mod tests {
    use super::testing::{MockBackend, Scripted};
    use super::*;
    use crate::backend::{BackendError, BackendReply};
    use serde_json::json;

    #[test]
    fn defaults_apply_when_no_capabilities_given() {
        let finder = Finder::new(MockBackend::new(), None, FinderConfig::default());
        assert_eq!(finder.capabilities().len(), 4);
        assert_eq!(finder.capabilities()[1], "disinformation detection");

        let finder = Finder::new(MockBackend::new(), Some(vec![]), FinderConfig::default());
        assert_eq!(finder.capabilities().len(), 4);
    }

    #[test]
    fn explicit_capabilities_are_kept_in_order() {
        let caps = vec!["X".to_string(), "Y".to_string()];
        let finder = Finder::new(MockBackend::new(), Some(caps.clone()), FinderConfig::default());
        assert_eq!(finder.capabilities(), caps.as_slice());
        assert!(finder.seed_company().is_none());
    }

    #[tokio::test]
    async fn seed_company_profile_supplies_capabilities() {
        let backend = MockBackend::new().on_search(
            "",
            Scripted::Reply(BackendReply::Structured(json!({
                "description": "Narrative risk intelligence.",
                "products_and_services_info": "Constellation platform",
                "extraction_reasoning": "Product focus",
                "identified_capabilities": ["narrative risk", "bot detection"]
            }))),
        );

        let finder = Finder::with_seed_company(backend, "BlackBird.AI", None, FinderConfig::default())
            .await;

        assert_eq!(finder.capabilities(), ["narrative risk", "bot detection"]);
        assert_eq!(finder.seed_company(), Some("BlackBird.AI"));
        assert_eq!(finder.seed_description(), Some("Narrative risk intelligence."));
    }

    #[tokio::test]
    async fn failed_profile_falls_back_to_supplied_capabilities() {
        let backend =
            MockBackend::new().on_search("", Scripted::Fail(BackendError::RateLimited));

        let finder = Finder::with_seed_company(
            backend,
            "Acme",
            Some(vec!["satellite imagery".into()]),
            FinderConfig::default(),
        )
        .await;

        assert_eq!(finder.capabilities(), ["satellite imagery"]);
        assert_eq!(finder.seed_company(), Some("Acme"));
        assert!(finder.seed_description().is_none());
    }
}
