//! Page fetching: SSRF guard, bounded download, readability extraction, Markdown.

pub mod converter;
mod extractor;
mod ssrf;

pub use converter::FetchedPage;
pub use ssrf::{DnsResolver, TokioDnsResolver};

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use converter::to_page;
use extractor::extract_main_content;

const MAX_RESPONSE_BYTES: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("blocked: internal/private host not allowed")]
    InternalHost,

    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,
}

struct Downloaded {
    final_url: String,
    mime: Option<String>,
    text: String,
}

pub async fn fetch_page(
    client: &Client,
    url: &str,
    resolver: &impl DnsResolver,
) -> Result<FetchedPage, FetchError> {
    // The resolver check and reqwest's own lookup can disagree (DNS
    // rebinding); closing that needs a custom connector.
    ssrf::guard(url, resolver).await?;

    let downloaded = download(client, url).await?;
    ssrf::guard(&downloaded.final_url, resolver).await?;

    debug!(
        url = %ssrf::redact(&downloaded.final_url),
        bytes = downloaded.text.len(),
        "page fetched"
    );

    if downloaded.mime.as_deref() == Some("text/plain") {
        return Ok(FetchedPage {
            url: downloaded.final_url,
            title: None,
            markdown: downloaded.text.trim().to_string(),
            used_raw_fallback: false,
        });
    }

    let extracted = extract_main_content(&downloaded.text, &downloaded.final_url);
    Ok(to_page(extracted, downloaded.final_url))
}

async fn download(client: &Client, url: &str) -> Result<Downloaded, FetchError> {
    let mut response = client
        .get(url)
        .header("User-Agent", crate::USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let (mime, charset) = parse_content_type(content_type.as_deref());
    if let Some(mime) = &mime
        && !is_textual(mime)
    {
        return Err(FetchError::UnsupportedContentType(mime.clone()));
    }

    if response
        .content_length()
        .is_some_and(|len| len as usize > MAX_RESPONSE_BYTES)
    {
        return Err(FetchError::TooLarge);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::TooLarge);
        }
    }

    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(&body);

    Ok(Downloaded {
        final_url,
        mime,
        text: text.into_owned(),
    })
}

/// Splits `text/html; charset=EUC-KR` into lowercase mime and charset label.
fn parse_content_type(header: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(header) = header else {
        return (None, None);
    };
    let mut parts = header.split(';');
    let mime = parts
        .next()
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let charset = parts.find_map(|p| {
        let (key, value) = p.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    });
    (mime, charset)
}

fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/") || mime == "application/xhtml+xml"
}
