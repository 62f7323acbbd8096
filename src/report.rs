//! Markdown and JSON rendering of search results for the CLI.

use serde::Serialize;

use crate::retrieval::Document;
use crate::store::SearchHit;

const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Serialize)]
pub struct QueryResults<'a> {
    pub topic: &'a str,
    pub role: &'a str,
    pub query: &'a str,
    pub hits: &'a [SearchHit],
}

pub fn format_queries(topic: &str, role: &str, queries: &[String]) -> String {
    let mut output = format!(
        "# Queries: {} ({})\n\n",
        sanitize_heading(topic),
        sanitize_heading(role)
    );
    for query in queries {
        output.push_str(&format!("- {query}\n"));
    }
    output
}

pub fn format_hits(results: &QueryResults<'_>) -> String {
    render(
        results.topic,
        results.role,
        results.query,
        results.hits.iter().map(|hit| (&hit.document, Some(hit.score))),
    )
}

pub fn format_documents(topic: &str, role: &str, query: &str, documents: &[Document]) -> String {
    render(topic, role, query, documents.iter().map(|doc| (doc, None)))
}

pub fn to_json(results: &[QueryResults<'_>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

fn render<'a>(
    topic: &str,
    role: &str,
    query: &str,
    items: impl Iterator<Item = (&'a Document, Option<f32>)>,
) -> String {
    let mut output = format!(
        "# {} ({}): {}\n\n",
        sanitize_heading(topic),
        sanitize_heading(role),
        sanitize_heading(query)
    );

    let mut sources: Vec<(&str, &str)> = Vec::new();
    let mut count = 0;
    for (doc, score) in items {
        count += 1;
        match score {
            Some(score) => output.push_str(&format!(
                "## {count}. {} (score {score:.3})\n\n",
                heading_for(doc)
            )),
            None => output.push_str(&format!("## {count}. {}\n\n", heading_for(doc))),
        }
        output.push_str(&excerpt(&doc.content));
        output.push_str("\n\n");

        if doc.meta("kind") != Some("answer")
            && let Some(url) = doc.meta("source")
            && !sources.iter().any(|(seen, _)| *seen == url)
        {
            sources.push((url, doc.meta("title").unwrap_or(url)));
        }
    }

    if count == 0 {
        output.push_str("(No matching documents.)\n");
        return output;
    }

    if !sources.is_empty() {
        output.push_str("---\n**Sources:**\n");
        for (url, title) in sources {
            output.push_str(&format!("- [{}]({})\n", escape_md_link(title), url));
        }
    }

    output
}

fn heading_for(doc: &Document) -> String {
    let label = doc
        .meta("title")
        .or_else(|| doc.meta("source"))
        .unwrap_or("(untitled)");
    match doc.meta("kind") {
        Some("answer") => format!("{} (search answer)", sanitize_heading(label)),
        _ => sanitize_heading(label),
    }
}

fn excerpt(content: &str) -> String {
    let content = content.trim();
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Newlines would end the heading early.
fn sanitize_heading(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
