//! GitHub commit URLs.

use std::sync::LazyLock;

use predict_shared::LinkOrigin;
use regex::Regex;
use url::Url;

use super::{CommitTarget, LinkRule};

/// `/{owner}/{repo}/commit/{hash}` with an optional trailing slash.
static COMMIT_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?([A-Za-z0-9-]+)/([A-Za-z0-9-]+)/commit/([0-9a-f]{5,40})/?$")
        .expect("github commit path regex")
});

const GITHUB_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Recognizes `https://github.com/{owner}/{repo}/commit/{hash}`.
pub struct GitHubCommitRule;

impl LinkRule for GitHubCommitRule {
    fn detect(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| GITHUB_HOSTS.contains(&host))
    }

    fn extract(&self, url: &Url) -> Option<CommitTarget> {
        let caps = COMMIT_PATH_RE.captures(url.path())?;
        Some(CommitTarget {
            repo_owner: caps[1].to_string(),
            repo_name: caps[2].to_string(),
            commit_hash: caps[3].to_string(),
        })
    }

    fn origin(&self) -> LinkOrigin {
        LinkOrigin::GitHubDirect
    }

    fn name(&self) -> &str {
        "github"
    }
}
