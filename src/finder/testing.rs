//! Scripted backend for exercising the finder without network access.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::json;

use super::types::Company;
use crate::backend::{Backend, BackendError, BackendReply, LocationHint, OutputSchema};

pub(crate) enum Scripted {
    Reply(BackendReply),
    Fail(BackendError),
    Hang,
    Panic,
}

#[derive(Default)]
pub(crate) struct MockBackend {
    searches: Mutex<HashMap<String, VecDeque<Scripted>>>,
    reasons: Mutex<HashMap<String, VecDeque<Scripted>>>,
    search_log: Mutex<Vec<(String, String)>>,
    reason_log: Mutex<Vec<String>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues the next search outcome for `country` ("" for calls without a location).
    pub(crate) fn on_search(self, country: &str, outcome: Scripted) -> Self {
        self.searches
            .lock()
            .unwrap()
            .entry(country.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub(crate) fn finding(self, country: &str, names: &[&str]) -> Self {
        self.on_search(country, Scripted::Reply(companies_reply(names)))
    }

    /// Queues a refinement outcome served to any country without its own queue.
    pub(crate) fn on_reason(self, outcome: Scripted) -> Self {
        self.on_reason_for("", outcome)
    }

    /// Queues a refinement outcome for reviews of `country`'s results.
    pub(crate) fn on_reason_for(self, country: &str, outcome: Scripted) -> Self {
        self.reasons
            .lock()
            .unwrap()
            .entry(country.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub(crate) fn prompts_for(&self, country: &str) -> Vec<String> {
        self.search_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == country)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub(crate) fn reason_prompts(&self) -> Vec<String> {
        self.reason_log.lock().unwrap().clone()
    }

    async fn play(outcome: Option<Scripted>) -> Result<BackendReply, BackendError> {
        match outcome {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Panic) => panic!("scripted backend panic"),
            None => Ok(companies_reply(&[])),
        }
    }
}

impl Backend for MockBackend {
    async fn search(
        &self,
        prompt: &str,
        location: Option<&LocationHint>,
        _schema: Option<&OutputSchema>,
    ) -> Result<BackendReply, BackendError> {
        let country = location.map(|l| l.country.clone()).unwrap_or_default();
        self.search_log
            .lock()
            .unwrap()
            .push((country.clone(), prompt.to_string()));
        let outcome = self
            .searches
            .lock()
            .unwrap()
            .get_mut(&country)
            .and_then(VecDeque::pop_front);
        Self::play(outcome).await
    }

    async fn reason(
        &self,
        prompt: &str,
        _schema: &OutputSchema,
    ) -> Result<BackendReply, BackendError> {
        self.reason_log.lock().unwrap().push(prompt.to_string());
        let country = reviewed_country(prompt).unwrap_or_default();
        let outcome = {
            let mut reasons = self.reasons.lock().unwrap();
            reasons
                .get_mut(country)
                .and_then(VecDeque::pop_front)
                .or_else(|| reasons.get_mut("").and_then(VecDeque::pop_front))
        };
        match outcome {
            None => Ok(refinement_reply(&[], "")),
            other => Self::play(other).await,
        }
    }
}

/// Country code of the search whose results a refinement prompt carries,
/// read from its first "Companies in XX ..." query.
fn reviewed_country(prompt: &str) -> Option<&str> {
    prompt
        .split("Companies in ")
        .nth(1)?
        .split_whitespace()
        .next()
}

pub(crate) fn company(name: &str) -> Company {
    Company {
        name: name.to_string(),
        url: format!("https://{}.example", name.trim().to_lowercase().replace(' ', "-")),
        description: format!("{name} builds things."),
        country: "GB".to_string(),
        industry: "Technology".to_string(),
        size: "11-50".to_string(),
        founded: "2019".to_string(),
    }
}

pub(crate) fn companies_reply(names: &[&str]) -> BackendReply {
    let companies: Vec<Company> = names.iter().map(|n| company(n)).collect();
    BackendReply::Structured(json!({
        "search_strategy": "web research",
        "companies": companies,
    }))
}

pub(crate) fn refinement_reply(relevant: &[&str], additional_query: &str) -> BackendReply {
    BackendReply::Structured(json!({
        "relevant_companies": relevant,
        "additional_query": additional_query,
    }))
}
