use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub instructions: String,
    pub input: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub search_context_size: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_location: Option<UserLocation>,
}

#[derive(Debug, Serialize)]
pub struct UserLocation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub country: String,
    pub region: String,
    pub city: String,
}

impl From<&LocationHint> for UserLocation {
    fn from(hint: &LocationHint) -> Self {
        Self {
            kind: "approximate",
            country: hint.country.clone(),
            region: hint.region.clone(),
            city: hint.city.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextConfig {
    pub format: TextFormat,
}

#[derive(Debug, Serialize)]
pub struct TextFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct Reasoning {
    pub effort: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<ApiError>,
}

/// Approximate location the backend should bias its web research toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationHint {
    pub country: String,
    pub region: String,
    pub city: String,
}

/// A named JSON schema the backend is asked to conform its answer to.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    pub fn of<T: JsonSchema>(name: &'static str) -> Self {
        Self {
            name,
            schema: schemars::schema_for!(T).to_value(),
        }
    }
}

/// What the backend handed back: parsed JSON when a schema was requested and
/// honored, free text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    Structured(Value),
    Text(String),
}
