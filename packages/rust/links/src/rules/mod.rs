//! Link rule trait and built-in rules for recognizing commit URLs.
//!
//! Rules recognize specific forges (GitHub, gitweb mirrors, ...) and pull the
//! `(owner, repo, commit)` triple out of a parsed URL.

mod github;
mod mirror;

use predict_shared::LinkOrigin;
use url::Url;

pub use github::GitHubCommitRule;
pub use mirror::{KnownMirrorRule, MirrorTable};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The commit a URL points at, before canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTarget {
    /// Repository owner.
    pub repo_owner: String,
    /// Repository name.
    pub repo_name: String,
    /// Commit hash.
    pub commit_hash: String,
}

/// Trait for forge-specific commit recognition.
///
/// Rules are tried in priority order; a URL that no rule extracts is opaque.
pub trait LinkRule: Send + Sync {
    /// Whether this rule is responsible for the URL's host.
    fn detect(&self, url: &Url) -> bool;

    /// Extract the commit triple. `None` lets the URL fall through.
    fn extract(&self, url: &Url) -> Option<CommitTarget>;

    /// Origin recorded on links this rule produces.
    fn origin(&self) -> LinkOrigin;

    /// Human-readable rule name for tracing.
    fn name(&self) -> &str;
}
