//! Gemini API client: grounded web search and plain text generation.

pub mod client;
pub mod grounding;
pub mod types;

pub use client::{GeminiClient, GeminiError, SearchClient, TextClient};
