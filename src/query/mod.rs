//! Turns a debate topic and role into web search queries.

mod lang;

pub use lang::Lang;

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::gemini::{GeminiError, TextClient};

pub const DEFAULT_MAX_QUERIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query generation failed: {0}")]
    Gemini(#[from] GeminiError),
}

/// Produces an ordered list of search queries for a (topic, role) pair.
pub trait QueryImprover {
    async fn improve(&self, topic: &str, role: &str) -> Result<Vec<String>, QueryError>;
}

/// Asks an LLM for role-specific search queries.
pub struct LlmQueryImprover<C> {
    client: C,
    max_queries: usize,
}

impl<C: TextClient> LlmQueryImprover<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            max_queries: DEFAULT_MAX_QUERIES,
        }
    }

    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = max_queries.max(1);
        self
    }
}

impl<C: TextClient> QueryImprover for LlmQueryImprover<C> {
    async fn improve(&self, topic: &str, role: &str) -> Result<Vec<String>, QueryError> {
        let prompt = build_prompt(topic, role, self.max_queries);
        let text = self.client.generate(&prompt).await?;

        let mut queries = parse_queries(&text);
        queries.truncate(self.max_queries);
        if queries.is_empty() {
            warn!(topic, role, "model returned no usable queries, using fallback");
            return Ok(fallback_queries(topic, role));
        }

        debug!(topic, role, ?queries, "queries generated");
        Ok(queries)
    }
}

fn build_prompt(topic: &str, role: &str, count: usize) -> String {
    format!(
        "You are preparing research for a debate.\n\
         Topic: {topic}\n\
         Role: {role}\n\n\
         Write {count} concise web search queries that would find evidence, \
         statistics and arguments this role can use on this topic. \
         Respond with a JSON array of strings and nothing else."
    )
}

/// Used when the model gives nothing parseable.
pub fn fallback_queries(topic: &str, role: &str) -> Vec<String> {
    let topic = topic.trim();
    let role = role.trim();
    vec![
        topic.to_string(),
        format!("{topic} {role} arguments"),
        format!("{topic} {role} evidence"),
    ]
}

/// Accepts a JSON array (optionally fenced) or one query per line.
pub(crate) fn parse_queries(text: &str) -> Vec<String> {
    let body = strip_code_fence(text.trim());

    let candidates: Vec<String> = match serde_json::from_str::<Vec<String>>(body) {
        Ok(list) => list,
        Err(_) => body.lines().map(strip_list_marker).map(str::to_string).collect(),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty() && !q.starts_with('[') && !q.starts_with(']'))
        .filter(|q| seen.insert(q.to_lowercase()))
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (`json`) on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    let line = if digits > 0 {
        line[digits..]
            .strip_prefix(". ")
            .or_else(|| line[digits..].strip_prefix(") "))
            .unwrap_or(line)
    } else {
        line
    };
    line.trim().trim_end_matches(',').trim_matches('"')
}
