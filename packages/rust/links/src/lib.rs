//! Reference link classification and CVE record building.
//!
//! This crate provides:
//! - [`rules`] — forge-specific commit recognizers (GitHub, gitweb mirrors)
//! - [`LinkClassifier`] — runs the rules first-match-wins and canonicalizes
//!   recognized commits through an injected [`Router`]
//! - [`record`] — turns raw upstream metadata into a [`CveRecord`](predict_shared::CveRecord)

pub mod record;
pub mod rules;

use std::sync::Arc;

use predict_shared::{ClassifiedLink, CommitLink, RouteTarget, Router, VulnerabilityId};
use tracing::trace;
use url::Url;

pub use record::{build, build_record};
pub use rules::{CommitTarget, GitHubCommitRule, KnownMirrorRule, LinkRule, MirrorTable};

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Holds link rules in priority order plus the routing function.
///
/// Classification is pure: the same input always yields the same output and
/// nothing is cached or mutated.
pub struct LinkClassifier {
    rules: Vec<Box<dyn LinkRule>>,
    router: Arc<dyn Router>,
}

impl LinkClassifier {
    /// Create a classifier with the built-in rules over `mirrors`.
    pub fn new(mirrors: MirrorTable, router: Arc<dyn Router>) -> Self {
        Self {
            rules: vec![
                Box::new(GitHubCommitRule),
                Box::new(KnownMirrorRule::new(mirrors)),
            ],
            router,
        }
    }

    /// Create a classifier with an explicit rule list (tried in order).
    pub fn with_rules(rules: Vec<Box<dyn LinkRule>>, router: Arc<dyn Router>) -> Self {
        Self { rules, router }
    }

    /// Classify one reference URL found on `cve_id`'s record.
    ///
    /// Never fails: unparseable URLs and URLs no rule extracts come back as
    /// [`ClassifiedLink::Opaque`] with the input unchanged.
    pub fn classify(&self, cve_id: &VulnerabilityId, raw: &str) -> ClassifiedLink {
        let opaque = || ClassifiedLink::Opaque {
            url: raw.to_string(),
        };

        let url = match Url::parse(raw.trim()) {
            Ok(url) => url,
            Err(e) => {
                trace!(url = raw, error = %e, "unparseable reference, keeping as opaque");
                return opaque();
            }
        };

        for rule in &self.rules {
            if !rule.detect(&url) {
                continue;
            }
            match rule.extract(&url) {
                Some(target) => {
                    trace!(url = raw, rule = rule.name(), "recognized commit link");
                    return ClassifiedLink::Commit(self.commit_link(cve_id, raw, target, rule.as_ref()));
                }
                None => {
                    trace!(url = raw, rule = rule.name(), "host matched but no commit extracted");
                }
            }
        }

        opaque()
    }

    fn commit_link(
        &self,
        cve_id: &VulnerabilityId,
        raw: &str,
        target: CommitTarget,
        rule: &dyn LinkRule,
    ) -> CommitLink {
        let canonical_url = self.router.route(&RouteTarget {
            cve_id: cve_id.as_str(),
            repo_owner: &target.repo_owner,
            repo_name: &target.repo_name,
            commit: &target.commit_hash,
            file_name: None,
        });

        CommitLink {
            original_url: raw.to_string(),
            canonical_url,
            repo_owner: target.repo_owner,
            repo_name: target.repo_name,
            commit_hash: target.commit_hash,
            origin: rule.origin(),
        }
    }

    /// Names of the configured rules, in priority order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}
