use tracing::warn;

use super::types::{Candidate, GenerateContentResponse, GroundedResult, Source};

fn first_candidate(response: &GenerateContentResponse) -> Option<&Candidate> {
    response.candidates.as_ref().and_then(|c| c.first())
}

/// Concatenates the text parts of the first candidate.
pub fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let content = first_candidate(response)?.content.as_ref()?;
    let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub fn extract_grounded_result(response: &GenerateContentResponse) -> GroundedResult {
    let answer = extract_text(response);
    if answer.is_none() {
        warn!("Gemini returned empty answer (safety filter or empty response)");
    }

    let sources = first_candidate(response)
        .and_then(|c| c.grounding_metadata.as_ref())
        .and_then(|m| m.grounding_chunks.as_ref())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = chunk.web.as_ref()?;
                    let url = web.uri.as_ref().filter(|u| !u.is_empty())?.clone();
                    Some(Source {
                        url,
                        title: web.title.clone().unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    GroundedResult { answer, sources }
}
