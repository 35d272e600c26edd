//! Collaborator seams: where metadata and annotations come from.
//!
//! The core only consumes already-materialized values; these traits let the
//! orchestration in [`crate::lookup`] and [`crate::resolution`] run against
//! the NVD client and the annotation database, or against in-memory doubles.

use std::future::Future;

use predict_nvd::NvdClient;
use predict_shared::{Annotation, RawMetadata, Result, VulnerabilityId};
use predict_storage::Storage;

/// Supplies raw vulnerability metadata. `Ok(None)` means upstream has no record.
pub trait MetadataSource {
    /// Fetch metadata for a validated id.
    fn fetch(&self, cve_id: &VulnerabilityId) -> impl Future<Output = Result<Option<RawMetadata>>>;
}

/// Supplies read-only snapshots of annotation rows.
pub trait AnnotationSource {
    /// List annotations, optionally for a single vulnerability.
    fn list(&self, cve_id: Option<&VulnerabilityId>) -> impl Future<Output = Result<Vec<Annotation>>>;
}

impl MetadataSource for NvdClient {
    fn fetch(&self, cve_id: &VulnerabilityId) -> impl Future<Output = Result<Option<RawMetadata>>> {
        NvdClient::fetch(self, cve_id)
    }
}

impl AnnotationSource for Storage {
    fn list(&self, cve_id: Option<&VulnerabilityId>) -> impl Future<Output = Result<Vec<Annotation>>> {
        self.list_annotations(cve_id)
    }
}

impl AnnotationSource for [Annotation] {
    async fn list(&self, cve_id: Option<&VulnerabilityId>) -> Result<Vec<Annotation>> {
        Ok(self
            .iter()
            .filter(|a| cve_id.is_none_or(|id| a.cve_id.eq_ignore_ascii_case(id.as_str())))
            .cloned()
            .collect())
    }
}
