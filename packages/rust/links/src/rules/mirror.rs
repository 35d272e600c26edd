//! Gitweb commit URLs on forge hosts that are mirrored on GitHub.

use std::collections::{BTreeMap, HashMap};

use predict_shared::{LinkOrigin, MirrorRepo};
use url::Url;

use super::{CommitTarget, LinkRule};

/// Built-in forge hosts and the GitHub repository each one mirrors.
const BUILTIN_MIRRORS: [(&str, &str, &str); 6] = [
    ("git.qemu.org", "qemu", "qemu"),
    ("git.openssl.org", "openssl", "openssl"),
    ("git.kernel.org", "torvalds", "linux"),
    ("git.videolan.org", "FFmpeg", "FFmpeg"),
    ("git.libav.org", "libav", "libav"),
    ("libvirt.org", "libvirt", "libvirt"),
];

// ---------------------------------------------------------------------------
// MirrorTable
// ---------------------------------------------------------------------------

/// Maps forge hosts to the fixed `(owner, repo)` of their GitHub mirror.
///
/// [`MirrorTable::default`] holds the built-in hosts; tests and configuration
/// can start from [`MirrorTable::empty`] or layer overrides on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTable {
    hosts: HashMap<String, MirrorRepo>,
}

impl MirrorTable {
    /// A table with no hosts.
    pub fn empty() -> Self {
        Self {
            hosts: HashMap::new(),
        }
    }

    /// Add or replace a host. Hosts are matched case-insensitively.
    pub fn insert(&mut self, host: &str, owner: &str, repo: &str) {
        self.hosts.insert(
            host.to_ascii_lowercase(),
            MirrorRepo {
                owner: owner.to_string(),
                repo: repo.to_string(),
            },
        );
    }

    /// Builder-style [`MirrorTable::insert`].
    pub fn with_host(mut self, host: &str, owner: &str, repo: &str) -> Self {
        self.insert(host, owner, repo);
        self
    }

    /// Layer configured mirrors over this table (config wins on conflicts).
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, MirrorRepo>) -> Self {
        for (host, repo) in overrides {
            self.insert(host, &repo.owner, &repo.repo);
        }
        self
    }

    /// Look up the mirror for a host.
    pub fn get(&self, host: &str) -> Option<&MirrorRepo> {
        self.hosts.get(&host.to_ascii_lowercase())
    }

    /// Number of known hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no hosts are known.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Default for MirrorTable {
    fn default() -> Self {
        BUILTIN_MIRRORS
            .iter()
            .fold(Self::empty(), |table, (host, owner, repo)| {
                table.with_host(host, owner, repo)
            })
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Recognizes gitweb links such as `https://git.kernel.org/?p=...;a=commit;h=<hash>`.
pub struct KnownMirrorRule {
    table: MirrorTable,
}

impl KnownMirrorRule {
    /// Create a rule over the given host table.
    pub fn new(table: MirrorTable) -> Self {
        Self { table }
    }

    /// The host table in use.
    pub fn table(&self) -> &MirrorTable {
        &self.table
    }
}

impl LinkRule for KnownMirrorRule {
    fn detect(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.table.get(host).is_some())
    }

    fn extract(&self, url: &Url) -> Option<CommitTarget> {
        let mirror = self.table.get(url.host_str()?)?;
        let query = url.query()?;

        let action = query_value(query, "a")?;
        if !action.contains("commit") {
            return None;
        }
        let hash = query_value(query, "h")?;

        Some(CommitTarget {
            repo_owner: mirror.owner.clone(),
            repo_name: mirror.repo.clone(),
            commit_hash: hash,
        })
    }

    fn origin(&self) -> LinkOrigin {
        LinkOrigin::KnownMirror
    }

    fn name(&self) -> &str {
        "known-mirror"
    }
}

/// First non-empty value for `key`. Gitweb separates pairs with `;` as well as `&`.
fn query_value(query: &str, key: &str) -> Option<String> {
    query
        .split(['&', ';'])
        .filter_map(|pair| url::form_urlencoded::parse(pair.as_bytes()).next())
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(raw: &str) -> Option<CommitTarget> {
        let url = Url::parse(raw).unwrap();
        let rule = KnownMirrorRule::new(MirrorTable::default());
        if rule.detect(&url) { rule.extract(&url) } else { None }
    }

    #[test]
    fn default_table_has_builtin_hosts() {
        let table = MirrorTable::default();
        assert_eq!(table.len(), 6);
        let kernel = table.get("git.kernel.org").expect("kernel");
        assert_eq!((kernel.owner.as_str(), kernel.repo.as_str()), ("torvalds", "linux"));
        assert_eq!(table.get("GIT.VIDEOLAN.ORG").map(|m| m.owner.as_str()), Some("FFmpeg"));
    }

    #[test]
    fn semicolon_separated_gitweb_query() {
        let target = extract("https://git.kernel.org/?p=linux/kernel/git/torvalds/linux-2.6.git;a=commit;h=deadbeef")
            .expect("match");
        assert_eq!(target.repo_owner, "torvalds");
        assert_eq!(target.repo_name, "linux");
        assert_eq!(target.commit_hash, "deadbeef");
    }

    #[test]
    fn ampersand_separated_query() {
        let target = extract("http://git.qemu.org/?p=qemu.git&a=commitdiff&h=1234abc").expect("match");
        assert_eq!(target.repo_owner, "qemu");
        assert_eq!(target.commit_hash, "1234abc");
    }

    #[test]
    fn action_must_mention_commit() {
        assert!(extract("https://git.kernel.org/?a=tree;h=deadbeef").is_none());
    }

    #[test]
    fn missing_keys_fall_through() {
        assert!(extract("https://git.kernel.org/?a=commit").is_none());
        assert!(extract("https://git.kernel.org/?h=deadbeef").is_none());
        assert!(extract("https://git.kernel.org/?a=commit;h=").is_none());
        assert!(extract("https://git.kernel.org/").is_none());
    }

    #[test]
    fn first_non_empty_value_wins() {
        let target = extract("https://libvirt.org/?a=commit;h=;h=aaa111;h=bbb222").expect("match");
        assert_eq!(target.commit_hash, "aaa111");
    }

    #[test]
    fn unknown_host_not_detected() {
        assert!(extract("https://git.example.org/?a=commit;h=deadbeef").is_none());
    }

    #[test]
    fn overrides_replace_and_extend() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "git.kernel.org".to_string(),
            MirrorRepo {
                owner: "gregkh".into(),
                repo: "linux".into(),
            },
        );
        overrides.insert(
            "git.example.org".to_string(),
            MirrorRepo {
                owner: "example".into(),
                repo: "project".into(),
            },
        );
        let table = MirrorTable::default().with_overrides(&overrides);
        assert_eq!(table.len(), 7);
        assert_eq!(table.get("git.kernel.org").map(|m| m.owner.as_str()), Some("gregkh"));
        assert_eq!(table.get("git.example.org").map(|m| m.repo.as_str()), Some("project"));
    }
}
