use tracing::warn;

use super::types::{BackendReply, ResponsesResponse};

/// Pulls the assistant's answer out of a Responses API body.
///
/// Web-search responses lead with a `web_search_call` item, so the first
/// `message` item is located rather than assuming a fixed position.
pub fn extract_reply(response: &ResponsesResponse, structured: bool) -> Option<BackendReply> {
    let text = response
        .output
        .iter()
        .filter(|item| item.kind == "message")
        .flat_map(|item| item.content.iter())
        .find(|content| content.kind == "output_text")
        .and_then(|content| content.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty());

    let Some(text) = text else {
        warn!("backend returned no output text (refusal or empty response)");
        return None;
    };

    if structured && let Ok(value) = serde_json::from_str(text) {
        return Some(BackendReply::Structured(value));
    }
    Some(BackendReply::Text(text.to_string()))
}
