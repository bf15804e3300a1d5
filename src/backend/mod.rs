//! Research backend: the OpenAI Responses API client, its wire types, and reply extraction.

pub mod client;
mod output;
pub mod types;

pub use client::{Backend, BackendError, OpenAiClient};
pub use types::{BackendReply, LocationHint, OutputSchema};
