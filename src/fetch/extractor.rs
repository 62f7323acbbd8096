use dom_smoothie::{Config, Readability};
use tracing::debug;

pub(super) struct Extracted {
    pub title: Option<String>,
    pub html: String,
    /// Readability could not isolate an article; `html` is the whole page.
    pub used_raw_fallback: bool,
}

pub(super) fn extract_main_content(html: &str, url: &str) -> Extracted {
    let mut readability = match Readability::new(html, Some(url), Some(Config::default())) {
        Ok(r) => r,
        Err(e) => {
            debug!(%e, "readability init failed");
            return whole_page(html);
        }
    };

    if !readability.is_probably_readable() {
        return whole_page(html);
    }

    match readability.parse() {
        Ok(article) => {
            let title = article.title.trim();
            Extracted {
                title: (!title.is_empty())
                    .then(|| title.to_string())
                    .or_else(|| title_tag(html)),
                html: article.content.to_string(),
                used_raw_fallback: false,
            }
        }
        Err(e) => {
            debug!(%e, "readability parse failed");
            whole_page(html)
        }
    }
}

fn whole_page(html: &str) -> Extracted {
    Extracted {
        title: title_tag(html),
        html: html.to_string(),
        used_raw_fallback: true,
    }
}

/// `<title>` lookup by ASCII case folding, which keeps byte offsets intact.
fn title_tag(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title>")?;
    let title = html[start..end].trim();
    (!title.is_empty()).then(|| title.to_string())
}
