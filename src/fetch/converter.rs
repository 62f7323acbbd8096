use super::extractor::Extracted;

/// A fetched page reduced to Markdown.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub markdown: String,
    pub used_raw_fallback: bool,
}

pub(super) fn to_page(extracted: Extracted, url: String) -> FetchedPage {
    let markdown = html2md::rewrite_html(&extracted.html, false);
    FetchedPage {
        url,
        title: extracted.title,
        markdown: collapse_blank_lines(&markdown),
        used_raw_fallback: extracted.used_raw_fallback,
    }
}

/// Squeezes runs of blank lines to one and trims trailing spaces, so chunk
/// budgets go to text rather than layout.
fn collapse_blank_lines(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;
    for line in markdown.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_html_to_markdown() {
        let extracted = Extracted {
            title: Some("T".into()),
            html: "<h1>Heading</h1><p>Body text</p>".into(),
            used_raw_fallback: false,
        };

        let page = to_page(extracted, "https://example.com".into());

        assert!(page.markdown.contains("Heading"));
        assert!(page.markdown.contains("Body text"));
        assert!(!page.markdown.contains("<p>"));
        assert_eq!(page.title.as_deref(), Some("T"));
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(collapse_blank_lines("a  \n\n\n\nb\n\n"), "a\n\nb");
    }
}
