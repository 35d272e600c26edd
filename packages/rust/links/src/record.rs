//! CVE record builder.
//!
//! Combines metadata fetched by a collaborator with [`LinkClassifier`] output
//! into a [`CveRecord`].

use predict_shared::{ClassifiedLink, CveRecord, PredictError, RawMetadata, Result, VulnerabilityId};
use tracing::{debug, instrument};

use crate::LinkClassifier;

/// Build a record from a raw identifier and the collaborator's fetch result.
///
/// The identifier is validated first, so an invalid id is reported as
/// [`PredictError::InvalidIdentifier`] even when `metadata` is also absent.
/// `None` metadata means upstream has no such vulnerability and yields
/// [`PredictError::NotFound`].
pub fn build(
    classifier: &LinkClassifier,
    cve_id: &str,
    metadata: Option<RawMetadata>,
) -> Result<CveRecord> {
    let id = VulnerabilityId::parse(cve_id)?;
    let metadata = metadata.ok_or_else(|| PredictError::not_found(id.as_str()))?;
    Ok(build_record(classifier, &id, metadata.description, &metadata.links))
}

/// Partition `links` into commit and opaque links, keeping upstream order in each.
///
/// No deduplication: two references that canonicalize to the same commit are
/// both kept with their own `original_url`.
#[instrument(skip_all, fields(cve_id = %id, links = links.len()))]
pub fn build_record(
    classifier: &LinkClassifier,
    id: &VulnerabilityId,
    description: String,
    links: &[String],
) -> CveRecord {
    let mut commit_links = Vec::new();
    let mut opaque_links = Vec::new();

    for raw in links {
        match classifier.classify(id, raw) {
            ClassifiedLink::Commit(link) => commit_links.push(link),
            ClassifiedLink::Opaque { url } => opaque_links.push(url),
        }
    }

    debug!(
        commits = commit_links.len(),
        opaque = opaque_links.len(),
        "classified reference links"
    );

    CveRecord {
        id: id.clone(),
        description,
        commit_links,
        opaque_links,
    }
}
