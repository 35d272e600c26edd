//! The routing seam: how canonical in-app URLs are built.
//!
//! The core never constructs URLs itself. Callers inject a [`Router`] (any
//! `Fn(&RouteTarget) -> String` closure works) into the link classifier and the
//! consensus engine.

/// Everything a routing function needs to address a commit (or a file at a commit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget<'a> {
    /// Vulnerability the page is viewed under.
    pub cve_id: &'a str,
    /// Repository owner.
    pub repo_owner: &'a str,
    /// Repository name.
    pub repo_name: &'a str,
    /// Commit hash.
    pub commit: &'a str,
    /// File within the commit, for file-level (blame) pages.
    pub file_name: Option<&'a str>,
}

/// Builds canonical URLs for commits.
pub trait Router: Send + Sync {
    /// Render the canonical URL for `target`.
    fn route(&self, target: &RouteTarget<'_>) -> String;
}

impl<F> Router for F
where
    F: Fn(&RouteTarget<'_>) -> String + Send + Sync,
{
    fn route(&self, target: &RouteTarget<'_>) -> String {
        self(target)
    }
}
