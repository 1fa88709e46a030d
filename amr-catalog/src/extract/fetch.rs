//! Content acquisition for the extraction pipeline
//!
//! Turns a URL or an uploaded file into classifier input: PDF bytes are
//! forwarded untouched, HTML is reduced to plain text locally, and anything
//! else gets a best-effort lossy text decode. Total failure to obtain any
//! text is a reported fetch error, never a crash.

use amr_common::{Error, Result};
use tracing::debug;

/// What the caller handed the pipeline.
#[derive(Debug, Clone)]
pub enum ExtractionSource {
    Url(String),
    File {
        bytes: Vec<u8>,
        filename: Option<String>,
        content_type: Option<String>,
    },
}

/// Content ready for the classifier.
#[derive(Debug, Clone)]
pub enum AcquiredContent {
    /// Raw PDF bytes, forwarded as a document without local extraction
    Pdf(Vec<u8>),
    /// Plain text, already stripped and whitespace-normalized
    Text(String),
}

/// Acquire content from a source.
pub async fn acquire(client: &reqwest::Client, source: &ExtractionSource) -> Result<AcquiredContent> {
    match source {
        ExtractionSource::Url(url) => fetch_url(client, url).await,
        ExtractionSource::File {
            bytes,
            filename,
            content_type,
        } => decode_file(bytes, filename.as_deref(), content_type.as_deref()),
    }
}

async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<AcquiredContent> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Fetch(format!("GET {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::Fetch(format!(
            "GET {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let is_pdf = content_type.contains("application/pdf")
        || url.trim_end_matches('/').to_lowercase().ends_with(".pdf");

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Fetch(format!("reading body of {}: {}", url, e)))?;

    debug!(url, content_type, bytes = bytes.len(), "Content fetched");

    if is_pdf {
        return Ok(AcquiredContent::Pdf(bytes.to_vec()));
    }

    let text = if content_type.contains("html") || looks_like_html(&bytes) {
        html_to_text(&String::from_utf8_lossy(&bytes))
    } else {
        normalize_whitespace(&String::from_utf8_lossy(&bytes))
    };
    require_text(text, url)
}

fn decode_file(
    bytes: &[u8],
    filename: Option<&str>,
    content_type: Option<&str>,
) -> Result<AcquiredContent> {
    let name = filename.unwrap_or("upload");
    let lower_name = name.to_lowercase();
    let mime = content_type.unwrap_or("").to_lowercase();

    if mime.contains("application/pdf") || lower_name.ends_with(".pdf") || bytes.starts_with(b"%PDF") {
        return Ok(AcquiredContent::Pdf(bytes.to_vec()));
    }

    let text = if mime.contains("html")
        || lower_name.ends_with(".html")
        || lower_name.ends_with(".htm")
        || looks_like_html(bytes)
    {
        html_to_text(&String::from_utf8_lossy(bytes))
    } else {
        // Unknown types: best-effort plain-text decode
        normalize_whitespace(&String::from_utf8_lossy(bytes))
    };
    require_text(text, name)
}

fn require_text(text: String, source: &str) -> Result<AcquiredContent> {
    if text.trim().is_empty() {
        return Err(Error::Fetch(format!(
            "no text could be extracted from {}",
            source
        )));
    }
    Ok(AcquiredContent::Text(text))
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_lowercase();
    head.contains("<html") || head.contains("<!doctype html")
}

/// Reduce an HTML document to plain text: drop `<script>` and `<style>`
/// blocks entirely, strip remaining tags, decode the common entities, and
/// collapse whitespace.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];

        // Skip script/style blocks including their contents.
        let skipped = ["script", "style"].iter().find_map(|tag| {
            let open = format!("<{}", tag);
            if starts_with_ci(rest, &open) {
                let close = format!("</{}", tag);
                match find_ci(rest, &close) {
                    Some(pos) => {
                        let end = rest[pos..].find('>').map(|i| pos + i + 1).unwrap_or(rest.len());
                        Some(end)
                    }
                    None => Some(rest.len()),
                }
            } else {
                None
            }
        });
        if let Some(end) = skipped {
            rest = &rest[end..];
            continue;
        }

        // Ordinary tag: drop through the closing '>'.
        match rest.find('>') {
            Some(end) => {
                out.push(' ');
                rest = &rest[end + 1..];
            }
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);

    normalize_whitespace(&decode_entities(&out))
}

/// ASCII case-insensitive prefix test. Needles are ASCII tag names, so byte
/// offsets derived from these searches always land on char boundaries.
fn starts_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

/// ASCII case-insensitive substring search; returns a byte offset.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
