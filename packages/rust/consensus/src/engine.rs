//! Consensus resolution for one annotation group.
//!
//! Four stages per group, with no state carried between groups:
//! 1. Promote the focal user's entry to the front (stable move-to-front)
//! 2. Derive fix/intro links through the injected [`Router`]
//! 3. Compare every other entry against the focal entry
//! 4. Compute the block's agreement percentage

use std::sync::Arc;

use predict_shared::{
    Agreement, Annotation, AnnotationGroup, CommitLink, ConsensusBlock, ConsensusEntry,
    LinkOrigin, RouteTarget, Router,
};
use tracing::{debug, instrument};

/// Percentage reported when the focal user has no peers to disagree with.
const VACUOUS_AGREEMENT: f64 = 100.0;

/// Percentage reported when the focal user did not annotate the vulnerability.
const NO_FOCAL_AGREEMENT: f64 = 0.0;

/// Reconciles per-user annotations into [`ConsensusBlock`]s.
#[derive(Clone)]
pub struct ConsensusEngine {
    router: Arc<dyn Router>,
}

impl ConsensusEngine {
    /// Create an engine that builds display links with `router`.
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self { router }
    }

    /// Resolve one group against `focal_username`.
    #[instrument(skip_all, fields(cve_id = %group.cve_id, members = group.members.len()))]
    pub fn resolve(&self, group: &AnnotationGroup, focal_username: &str) -> ConsensusBlock {
        let (ordered, focal_present) = promote(&group.members, focal_username);

        let mut entries: Vec<ConsensusEntry> = ordered
            .into_iter()
            .map(|annotation| self.derive_links(&group.cve_id, annotation))
            .collect();

        let agreement_percentage = match entries.split_first_mut() {
            Some((focal, others)) if focal_present => {
                for entry in others.iter_mut() {
                    entry.agreement = Some(compare(&focal.annotation, &entry.annotation));
                }
                percentage(others)
            }
            _ => NO_FOCAL_AGREEMENT,
        };

        debug!(focal_present, agreement_percentage, "resolved consensus block");

        ConsensusBlock {
            cve_id: group.cve_id.clone(),
            entries,
            focal_present,
            agreement_percentage,
        }
    }

    /// Resolve every group, keeping the input group order.
    pub fn resolve_all(&self, groups: &[AnnotationGroup], focal_username: &str) -> Vec<ConsensusBlock> {
        groups
            .iter()
            .map(|group| self.resolve(group, focal_username))
            .collect()
    }

    fn derive_links(&self, cve_id: &str, annotation: Annotation) -> ConsensusEntry {
        let fix_link = self.commit_link(cve_id, &annotation, &annotation.fix_commit);
        let intro_link = self.commit_link(cve_id, &annotation, &annotation.intro_commit);
        let fix_file_url = self.file_url(cve_id, &annotation, &annotation.fix_commit, &annotation.fix_file);
        let intro_file_url =
            self.file_url(cve_id, &annotation, &annotation.intro_commit, &annotation.intro_file);

        ConsensusEntry {
            annotation,
            fix_link,
            intro_link,
            fix_file_url,
            intro_file_url,
            agreement: None,
        }
    }

    fn commit_link(&self, cve_id: &str, annotation: &Annotation, commit: &str) -> CommitLink {
        let canonical_url = self.router.route(&RouteTarget {
            cve_id,
            repo_owner: &annotation.repo_owner,
            repo_name: &annotation.repo_name,
            commit,
            file_name: None,
        });

        CommitLink {
            original_url: canonical_url.clone(),
            canonical_url,
            repo_owner: annotation.repo_owner.clone(),
            repo_name: annotation.repo_name.clone(),
            commit_hash: commit.to_string(),
            origin: LinkOrigin::Annotation,
        }
    }

    fn file_url(&self, cve_id: &str, annotation: &Annotation, commit: &str, file: &str) -> String {
        self.router.route(&RouteTarget {
            cve_id,
            repo_owner: &annotation.repo_owner,
            repo_name: &annotation.repo_name,
            commit,
            file_name: Some(file),
        })
    }
}

/// Stable move-to-front of the first member authored by `focal_username`.
fn promote(members: &[Annotation], focal_username: &str) -> (Vec<Annotation>, bool) {
    let mut ordered = members.to_vec();
    match ordered.iter().position(|a| a.username == focal_username) {
        Some(pos) => {
            ordered[..=pos].rotate_right(1);
            (ordered, true)
        }
        None => (ordered, false),
    }
}

/// Field-by-field agreement of `other` with the focal annotation.
fn compare(focal: &Annotation, other: &Annotation) -> Agreement {
    Agreement {
        fix_matches: other.fix_commit == focal.fix_commit && other.fix_file == focal.fix_file,
        intro_matches: other.intro_commit == focal.intro_commit
            && other.intro_file == focal.intro_file,
    }
}

/// Share of `others` in full (fix and intro) agreement with the focal entry.
fn percentage(others: &[ConsensusEntry]) -> f64 {
    if others.is_empty() {
        return VACUOUS_AGREEMENT;
    }
    let agreeing = others
        .iter()
        .filter(|e| e.agreement.is_some_and(|a| a.is_full()))
        .count();
    100.0 * agreeing as f64 / others.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Arc<dyn Router> {
        Arc::new(|t: &RouteTarget<'_>| match t.file_name {
            Some(file) => format!("/cve/{}/blame/{}/{}/{}/{}", t.cve_id, t.repo_owner, t.repo_name, t.commit, file),
            None => format!("/cve/{}/info/{}/{}/{}", t.cve_id, t.repo_owner, t.repo_name, t.commit),
        })
    }

    fn row(user: &str, fix: &str, fix_file: &str, intro: &str, intro_file: &str) -> Annotation {
        Annotation {
            cve_id: "CVE-2021-12345".into(),
            username: user.into(),
            repo_owner: "owner".into(),
            repo_name: "repo".into(),
            fix_commit: fix.into(),
            fix_file: fix_file.into(),
            intro_commit: intro.into(),
            intro_file: intro_file.into(),
        }
    }

    fn group(members: Vec<Annotation>) -> AnnotationGroup {
        AnnotationGroup {
            cve_id: "CVE-2021-12345".into(),
            members,
        }
    }

    fn usernames(block: &ConsensusBlock) -> Vec<&str> {
        block.entries.iter().map(|e| e.annotation.username.as_str()).collect()
    }

    #[test]
    fn promotes_focal_and_scores_peers() {
        let g = group(vec![
            row("x", "1", "f", "i", "g"),
            row("y", "1", "f", "i", "g"),
            row("z", "2", "h", "i", "g"),
        ]);
        let block = ConsensusEngine::new(router()).resolve(&g, "y");

        assert_eq!(usernames(&block), vec!["y", "x", "z"]);
        assert!(block.focal_present);
        assert!(block.entries[0].agreement.is_none());
        assert_eq!(
            block.entries[1].agreement,
            Some(Agreement {
                fix_matches: true,
                intro_matches: true
            })
        );
        let z = block.entries[2].agreement.expect("z compared");
        assert!(!z.fix_matches);
        assert!(z.intro_matches);
        assert_eq!(block.agreement_percentage, 50.0);
    }

    #[test]
    fn single_focal_entry_is_vacuous_agreement() {
        let g = group(vec![row("solo", "1", "f", "i", "g")]);
        let block = ConsensusEngine::new(router()).resolve(&g, "solo");
        assert_eq!(block.agreement_percentage, 100.0);
        assert_eq!(block.focal().map(|e| e.annotation.username.as_str()), Some("solo"));
    }

    #[test]
    fn absent_focal_keeps_order_and_scores_zero() {
        let g = group(vec![row("a", "1", "f", "i", "g"), row("b", "1", "f", "i", "g")]);
        let block = ConsensusEngine::new(router()).resolve(&g, "nobody");
        assert_eq!(usernames(&block), vec!["a", "b"]);
        assert!(!block.focal_present);
        assert!(block.focal().is_none());
        assert!(block.entries.iter().all(|e| e.agreement.is_none()));
        assert_eq!(block.agreement_percentage, 0.0);
    }

    #[test]
    fn empty_group_is_empty_block() {
        let block = ConsensusEngine::new(router()).resolve(&group(vec![]), "anyone");
        assert!(block.entries.is_empty());
        assert!(!block.focal_present);
        assert_eq!(block.agreement_percentage, 0.0);
    }

    #[test]
    fn promotion_preserves_relative_order_of_others() {
        let g = group(vec![
            row("a", "1", "f", "i", "g"),
            row("b", "1", "f", "i", "g"),
            row("c", "1", "f", "i", "g"),
            row("focal", "1", "f", "i", "g"),
            row("d", "1", "f", "i", "g"),
        ]);
        let block = ConsensusEngine::new(router()).resolve(&g, "focal");
        assert_eq!(usernames(&block), vec!["focal", "a", "b", "c", "d"]);
        assert_eq!(block.agreement_percentage, 100.0);
    }

    #[test]
    fn file_mismatch_breaks_agreement() {
        let g = group(vec![
            row("me", "1", "f", "i", "g"),
            row("other", "1", "other.c", "i", "g"),
        ]);
        let block = ConsensusEngine::new(router()).resolve(&g, "me");
        let agreement = block.entries[1].agreement.expect("compared");
        assert!(!agreement.fix_matches);
        assert!(agreement.intro_matches);
        assert_eq!(block.agreement_percentage, 0.0);
    }

    #[test]
    fn intro_only_mismatch_gets_no_credit() {
        let g = group(vec![
            row("me", "1", "f", "i", "g"),
            row("p1", "1", "f", "j", "g"),
            row("p2", "1", "f", "i", "g"),
            row("p3", "1", "f", "i", "g"),
        ]);
        let block = ConsensusEngine::new(router()).resolve(&g, "me");
        let pct = block.agreement_percentage;
        assert!((pct - 200.0 / 3.0).abs() < 1e-9, "got {pct}");
    }

    #[test]
    fn links_come_from_router() {
        let g = group(vec![row("me", "abc123", "src/a.c", "def456", "src/b.c")]);
        let block = ConsensusEngine::new(router()).resolve(&g, "me");
        let entry = &block.entries[0];

        assert_eq!(entry.fix_link.canonical_url, "/cve/CVE-2021-12345/info/owner/repo/abc123");
        assert_eq!(entry.fix_link.commit_hash, "abc123");
        assert_eq!(entry.fix_link.origin, LinkOrigin::Annotation);
        assert_eq!(entry.intro_link.canonical_url, "/cve/CVE-2021-12345/info/owner/repo/def456");
        assert_eq!(entry.fix_file_url, "/cve/CVE-2021-12345/blame/owner/repo/abc123/src/a.c");
        assert_eq!(entry.intro_file_url, "/cve/CVE-2021-12345/blame/owner/repo/def456/src/b.c");
    }

    #[test]
    fn only_first_focal_row_is_promoted() {
        let g = group(vec![
            row("a", "1", "f", "i", "g"),
            row("me", "1", "f", "i", "g"),
            row("me", "2", "f", "i", "g"),
        ]);
        let block = ConsensusEngine::new(router()).resolve(&g, "me");
        assert_eq!(usernames(&block), vec!["me", "a", "me"]);
        assert_eq!(block.entries[0].annotation.fix_commit, "1");
        assert_eq!(block.agreement_percentage, 50.0);
    }

    #[test]
    fn resolve_is_independent_of_group_order() {
        let engine = ConsensusEngine::new(router());
        let g1 = group(vec![row("me", "1", "f", "i", "g"), row("o", "2", "f", "i", "g")]);
        let mut g2 = group(vec![row("o", "1", "f", "i", "g"), row("me", "1", "f", "i", "g")]);
        g2.cve_id = "CVE-2021-99999".into();

        let forward = engine.resolve_all(&[g1.clone(), g2.clone()], "me");
        let backward = engine.resolve_all(&[g2, g1], "me");
        assert_eq!(forward[0], backward[1]);
        assert_eq!(forward[1], backward[0]);
    }
}
