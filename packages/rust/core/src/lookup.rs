//! CVE lookup: id → metadata fetch → classified record.

use predict_links::{LinkClassifier, record};
use predict_shared::{CveRecord, Result, VulnerabilityId};
use tracing::{info, instrument};

use crate::sources::MetadataSource;

/// Look up a vulnerability and build its normalized record.
///
/// The identifier is validated before `source` is touched, so malformed ids
/// never reach the network.
#[instrument(skip_all, fields(cve_id = raw_id))]
pub async fn lookup_cve<S>(source: &S, classifier: &LinkClassifier, raw_id: &str) -> Result<CveRecord>
where
    S: MetadataSource + ?Sized,
{
    let id = VulnerabilityId::parse(raw_id)?;
    let metadata = source.fetch(&id).await?;
    let record = record::build(classifier, id.as_str(), metadata)?;

    info!(
        commits = record.commit_links.len(),
        opaque = record.opaque_links.len(),
        "built vulnerability record"
    );
    Ok(record)
}
