//! Consensus view: annotation snapshot → groups → resolved blocks.

use predict_consensus::{ConsensusEngine, group};
use predict_shared::{ConsensusBlock, Result, VulnerabilityId};
use tracing::{info, instrument};

use crate::sources::AnnotationSource;

/// Build consensus blocks for `focal_username`, for one vulnerability or all.
///
/// `cve_id` is validated before the annotation source is read. Block order
/// follows the first appearance of each id in the source's snapshot.
#[instrument(skip_all, fields(focal = focal_username, cve_id = cve_id.unwrap_or("*")))]
pub async fn consensus_for<S>(
    source: &S,
    engine: &ConsensusEngine,
    focal_username: &str,
    cve_id: Option<&str>,
) -> Result<Vec<ConsensusBlock>>
where
    S: AnnotationSource + ?Sized,
{
    let filter = cve_id.map(VulnerabilityId::parse).transpose()?;
    let rows = source.list(filter.as_ref()).await?;
    let blocks = engine.resolve_all(&group(&rows), focal_username);

    info!(
        rows = rows.len(),
        blocks = blocks.len(),
        "resolved annotation consensus"
    );
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::routes::PathRouter;
    use predict_shared::{Annotation, PredictError};

    fn load_fixture() -> Vec<Annotation> {
        let content = std::fs::read_to_string("../../../fixtures/json/annotations.fixture.json")
            .expect("read fixture");
        serde_json::from_str(&content).expect("deserialize fixture")
    }

    fn engine() -> ConsensusEngine {
        ConsensusEngine::new(Arc::new(PathRouter::default()))
    }

    #[tokio::test]
    async fn all_blocks_for_focal_user() {
        let rows = load_fixture();
        let blocks = consensus_for(rows.as_slice(), &engine(), "bob", None).await.unwrap();

        let ids: Vec<&str> = blocks.iter().map(|b| b.cve_id.as_str()).collect();
        assert_eq!(ids, vec!["CVE-2021-3156", "CVE-2014-0160", "CVE-2016-5195"]);
        assert!(blocks.iter().all(|b| b.focal_present));

        // bob agrees with alice on sudo; carol and dave each differ somewhere.
        let sudo = &blocks[0];
        assert_eq!(sudo.entries[0].annotation.username, "bob");
        assert!((sudo.agreement_percentage - 100.0 / 3.0).abs() < 1e-9);

        // bob is alone on dirty cow.
        assert_eq!(blocks[2].agreement_percentage, 100.0);
    }

    #[tokio::test]
    async fn single_cve_filter() {
        let rows = load_fixture();
        let blocks = consensus_for(rows.as_slice(), &engine(), "alice", Some("cve-2014-0160"))
            .await
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].cve_id, "CVE-2014-0160");
        assert_eq!(blocks[0].entries.len(), 2);
        assert_eq!(
            blocks[0].entries[0].fix_file_url,
            "/cve/CVE-2014-0160/blame/openssl/openssl/96db9023b881d7cd9f379b0c154650d6c108e9a3/ssl%2Ft1_lib.c"
        );
    }

    #[tokio::test]
    async fn invalid_filter_rejected() {
        let rows = load_fixture();
        let err = consensus_for(rows.as_slice(), &engine(), "alice", Some("CVE-867-5309"))
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn storage_backed_consensus() {
        let path = std::env::temp_dir().join(format!("predict_core_{}.db", uuid::Uuid::now_v7()));
        let storage = predict_storage::Storage::open(&path).await.unwrap();
        for row in load_fixture() {
            storage.upsert_annotation(&row).await.unwrap();
        }

        let blocks = consensus_for(&storage, &engine(), "alice", None).await.unwrap();

        // Storage orders by id, so groups come out sorted.
        let ids: Vec<&str> = blocks.iter().map(|b| b.cve_id.as_str()).collect();
        assert_eq!(ids, vec!["CVE-2014-0160", "CVE-2016-5195", "CVE-2021-3156"]);
        assert_eq!(blocks[0].agreement_percentage, 100.0);
        assert!(!blocks[1].focal_present);
        let sudo_users: Vec<&str> = blocks[2]
            .entries
            .iter()
            .map(|e| e.annotation.username.as_str())
            .collect();
        assert_eq!(sudo_users, vec!["alice", "bob", "carol", "dave"]);
    }
}
