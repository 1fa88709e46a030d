//! External document classifier
//!
//! The classifier is a black box that maps document content plus a rendering
//! of the taxonomy to a best-effort structured draft. The trait keeps a seam
//! for tests; the production implementation calls the Anthropic messages
//! API with a strict-JSON, no-fabrication prompt at temperature 0.

use super::fetch::AcquiredContent;
use amr_common::config::ClassifierConfig;
use amr_common::taxonomy::Taxonomy;
use amr_common::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Anthropic messages API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// How much of a malformed classifier response to keep for diagnostics
const RAW_RESPONSE_TRUNCATE: usize = 400;

/// Hierarchy levels as returned by the classifier (keys, L1 through L5).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractedHierarchy {
    pub level1: Option<String>,
    pub level2: Option<String>,
    pub level3: Option<String>,
    pub level4: Option<String>,
    pub level5: Option<String>,
}

/// Structured classifier output. Every field is optional; the reconciler
/// treats the whole object as an untrusted candidate.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractedDraft {
    pub resource_name: Option<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub primary_hierarchy: ExtractedHierarchy,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub resource_url: Option<String>,
    pub contact_info: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub license: Option<String>,
}

/// Classifier seam.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    /// Classify document content into a draft candidate.
    async fn classify(&self, content: &AcquiredContent, taxonomy: &Taxonomy)
        -> Result<ExtractedDraft>;
}

/// Production classifier backed by the Anthropic messages API.
pub struct AnthropicClassifier {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClassifier {
    /// Build a classifier from config. Returns `None` when no API key is
    /// configured, in which case extraction endpoints report the classifier
    /// as unavailable.
    pub fn from_config(config: &ClassifierConfig) -> Option<Self> {
        let api_key = config.resolve_api_key()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            http_client,
            api_key,
            model: config.model.clone(),
        })
    }

    fn system_prompt(taxonomy: &Taxonomy) -> String {
        format!(
            "You classify documents about antimicrobial-resistance (AMR) surveillance \
             resources into a controlled vocabulary.\n\
             \n\
             Valid countries: {}\n\
             Valid domains: {}\n\
             \n\
             Resource-type hierarchy (answer with the KEYS on the left; the titles in \
             parentheses are display hints only):\n{}\n\
             \n\
             Respond with a single JSON object and nothing else, using exactly these \
             fields: resource_name, countries (array), domains (array), \
             primary_hierarchy (object with level1..level5), year_start, year_end, \
             resource_url, contact_info, description, keywords (array), license. \
             Use null or empty arrays for anything the document does not state.\n\
             Rules:\n\
             - Never invent values that are not supported by the document.\n\
             - Classify what the document itself IS, not topics it merely mentions.\n\
             - Hierarchy values must be keys from the listing above.",
            taxonomy.countries().join(", "),
            taxonomy.domains().join(", "),
            taxonomy.prompt_listing(),
        )
    }

    async fn call_api(&self, body: serde_json::Value) -> Result<String> {
        let response = self
            .http_client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Classify(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Classify(format!(
                "API error {}: {}",
                status,
                truncate(&body)
            )));
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Classify(format!("unreadable response: {}", e)))?;
        api_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| Error::Classify("empty response".to_string()))
    }
}

#[async_trait]
impl DocumentClassifier for AnthropicClassifier {
    async fn classify(
        &self,
        content: &AcquiredContent,
        taxonomy: &Taxonomy,
    ) -> Result<ExtractedDraft> {
        let user_content = match content {
            AcquiredContent::Text(text) => serde_json::json!([
                {"type": "text", "text": text}
            ]),
            AcquiredContent::Pdf(bytes) => serde_json::json!([
                {
                    "type": "document",
                    "source": {
                        "type": "base64",
                        "media_type": "application/pdf",
                        "data": base64::engine::general_purpose::STANDARD.encode(bytes),
                    }
                },
                {"type": "text", "text": "Classify this document."}
            ]),
        };

        let body = serde_json::json!({
            "model": &self.model,
            "max_tokens": 2048,
            "temperature": 0.0,
            "system": Self::system_prompt(taxonomy),
            "messages": [{"role": "user", "content": user_content}],
        });

        let raw = self.call_api(body).await?;
        debug!(bytes = raw.len(), "Classifier responded");
        parse_response(&raw)
    }
}

/// Parse the classifier's text into a draft, tolerating markdown code
/// fences. A malformed response keeps a truncated copy for diagnostics.
pub fn parse_response(raw: &str) -> Result<ExtractedDraft> {
    let trimmed = strip_code_fences(raw.trim());
    serde_json::from_str(trimmed).map_err(|e| {
        Error::Classify(format!(
            "response is not the expected JSON shape ({}): {}",
            e,
            truncate(raw)
        ))
    })
}

fn strip_code_fences(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= RAW_RESPONSE_TRUNCATE {
        text.to_string()
    } else {
        let cut: String = text.chars().take(RAW_RESPONSE_TRUNCATE).collect();
        format!("{}...", cut)
    }
}
