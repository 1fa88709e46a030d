//! AI extraction pipeline
//!
//! URL-or-file in, submission draft out: acquire content ([`fetch`]), ask
//! the external classifier for a structured candidate ([`classifier`]), then
//! reconcile that untrusted candidate against the taxonomy ([`reconcile`]).
//! Failures identify the faulting step (fetch vs classify) and never leave
//! partial state.

pub mod classifier;
pub mod fetch;
pub mod reconcile;

pub use classifier::{AnthropicClassifier, DocumentClassifier, ExtractedDraft};
pub use fetch::{AcquiredContent, ExtractionSource};

use amr_common::models::SubmissionDraft;
use amr_common::taxonomy::Taxonomy;
use amr_common::Result;
use tracing::info;

/// Run the full pipeline for one source.
pub async fn extract(
    http_client: &reqwest::Client,
    classifier: &dyn DocumentClassifier,
    taxonomy: &Taxonomy,
    source: &ExtractionSource,
) -> Result<SubmissionDraft> {
    let content = fetch::acquire(http_client, source).await?;
    let extracted = classifier.classify(&content, taxonomy).await?;
    let draft = reconcile::reconcile(&extracted, taxonomy);
    info!(
        resource_name = %draft.resource_name,
        countries = draft.countries.len(),
        domains = draft.domains.len(),
        "Extraction produced a draft"
    );
    Ok(draft)
}
