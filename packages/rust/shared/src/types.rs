//! Core domain types for vulnerability records and annotation consensus.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PredictError, Result};

// ---------------------------------------------------------------------------
// VulnerabilityId
// ---------------------------------------------------------------------------

/// `CVE-YYYY-N…` where the sequence part never exceeds seven digits.
static CVE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CVE-[0-9]{4}-[0-9]{4,7}$").expect("CVE id regex"));

/// A validated, uppercase CVE identifier (e.g. `CVE-2021-3156`).
///
/// Construction goes through [`VulnerabilityId::parse`] (or `FromStr`), which
/// uppercases the input before matching, so `cve-2021-3156` is accepted and
/// stored as `CVE-2021-3156`. Strings that fail the pattern never become a
/// `VulnerabilityId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VulnerabilityId(String);

impl VulnerabilityId {
    /// Validate and normalize a raw identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_uppercase();
        if CVE_ID_RE.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(PredictError::invalid_identifier(raw))
        }
    }

    /// Whether `raw` would be accepted by [`VulnerabilityId::parse`].
    pub fn is_valid(raw: &str) -> bool {
        CVE_ID_RE.is_match(&raw.trim().to_uppercase())
    }

    /// The normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VulnerabilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VulnerabilityId {
    type Err = PredictError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for VulnerabilityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for VulnerabilityId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Where a [`CommitLink`] was recognized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    /// A `github.com/{owner}/{repo}/commit/{hash}` URL.
    GitHubDirect,
    /// A gitweb URL on a forge host with a known GitHub mirror.
    KnownMirror,
    /// Built from an annotation row's `(owner, repo, commit)` triple.
    Annotation,
}

/// A reference recognized as a specific commit in a specific repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLink {
    /// The URL exactly as supplied upstream.
    pub original_url: String,
    /// The in-app URL produced by the routing function.
    pub canonical_url: String,
    /// Repository owner (GitHub user or organization).
    pub repo_owner: String,
    /// Repository name.
    pub repo_name: String,
    /// Commit hash (full or abbreviated).
    pub commit_hash: String,
    /// How the link was recognized.
    pub origin: LinkOrigin,
}

/// Outcome of classifying a single reference URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedLink {
    /// A recognized commit link.
    Commit(CommitLink),
    /// Anything else, kept verbatim.
    Opaque { url: String },
}

impl ClassifiedLink {
    /// The URL as it was supplied, regardless of classification.
    pub fn original_url(&self) -> &str {
        match self {
            Self::Commit(link) => &link.original_url,
            Self::Opaque { url } => url,
        }
    }

    /// The commit link, if this URL was recognized as one.
    pub fn as_commit(&self) -> Option<&CommitLink> {
        match self {
            Self::Commit(link) => Some(link),
            Self::Opaque { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CveRecord
// ---------------------------------------------------------------------------

/// Raw metadata as returned by the metadata collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadata {
    /// Free-text vulnerability description.
    pub description: String,
    /// Reference URLs in upstream order.
    pub links: Vec<String>,
}

/// A normalized vulnerability record, built once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CveRecord {
    /// The vulnerability identifier.
    pub id: VulnerabilityId,
    /// Upstream description.
    pub description: String,
    /// Recognized commit links, in upstream order.
    pub commit_links: Vec<CommitLink>,
    /// Unrecognized links, in upstream order, verbatim.
    pub opaque_links: Vec<String>,
}

impl CveRecord {
    /// Where a viewer should land first: the first recognized commit, if any.
    pub fn landing_url(&self) -> Option<&str> {
        self.commit_links.first().map(|l| l.canonical_url.as_str())
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// One user's claim about where a vulnerability was fixed and introduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Vulnerability identifier as stored (not necessarily validated).
    pub cve_id: String,
    /// Author of the annotation.
    pub username: String,
    /// Repository owner.
    pub repo_owner: String,
    /// Repository name.
    pub repo_name: String,
    /// Commit that fixed the vulnerability.
    pub fix_commit: String,
    /// File touched by the fix.
    pub fix_file: String,
    /// Commit that introduced the vulnerability.
    pub intro_commit: String,
    /// File in which the vulnerability was introduced.
    pub intro_file: String,
}

/// Annotations sharing one vulnerability id, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationGroup {
    /// Uppercased grouping key.
    pub cve_id: String,
    /// Members in input order.
    pub members: Vec<Annotation>,
}

/// How a non-focal entry compares to the focal user's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    /// Same fix commit and fix file.
    pub fix_matches: bool,
    /// Same intro commit and intro file.
    pub intro_matches: bool,
}

impl Agreement {
    /// Full agreement: both the fix point and the introduction point match.
    pub fn is_full(&self) -> bool {
        self.fix_matches && self.intro_matches
    }
}

/// An annotation enriched with display links and agreement against the focal user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusEntry {
    /// The underlying annotation.
    #[serde(flatten)]
    pub annotation: Annotation,
    /// Canonical link to the fix commit.
    pub fix_link: CommitLink,
    /// Canonical link to the introducing commit.
    pub intro_link: CommitLink,
    /// Blame-page URL for the fix file at the fix commit.
    pub fix_file_url: String,
    /// Blame-page URL for the intro file at the intro commit.
    pub intro_file_url: String,
    /// `None` for the focal entry itself, or when no focal entry exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<Agreement>,
}

/// One vulnerability's annotations with agreement statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusBlock {
    /// Uppercased vulnerability id.
    pub cve_id: String,
    /// Entries, focal user first when present.
    pub entries: Vec<ConsensusEntry>,
    /// Whether the focal user annotated this vulnerability.
    pub focal_present: bool,
    /// Share of non-focal entries in full agreement with the focal entry, 0–100.
    pub agreement_percentage: f64,
}

impl ConsensusBlock {
    /// The focal user's entry, if present.
    pub fn focal(&self) -> Option<&ConsensusEntry> {
        if self.focal_present {
            self.entries.first()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cve_id_validation() {
        assert!(VulnerabilityId::is_valid("CVE-2021-12345"));
        assert!(VulnerabilityId::is_valid("CVE-2014-0160"));
        assert!(VulnerabilityId::is_valid("CVE-2021-1234567"));
        assert!(!VulnerabilityId::is_valid("CVE-21-12345"));
        assert!(!VulnerabilityId::is_valid("CVE-2021-123"));
        assert!(!VulnerabilityId::is_valid("CVE-2021-12345678"));
        assert!(!VulnerabilityId::is_valid("CVE-867-5309"));
        assert!(!VulnerabilityId::is_valid("xCVE-2021-12345"));
        assert!(!VulnerabilityId::is_valid(""));
    }

    #[test]
    fn cve_id_rejects_non_ascii_digits() {
        // Arabic-Indic digits are `\d` in Unicode regexes.
        assert!(!VulnerabilityId::is_valid("CVE-٢٠٢١-12345"));
    }

    #[test]
    fn cve_id_is_uppercased() {
        let id = VulnerabilityId::parse("cve-2021-12345").expect("lowercase accepted");
        assert_eq!(id.as_str(), "CVE-2021-12345");
        assert_eq!(id, "CVE-2021-12345".parse().expect("parse"));
    }

    #[test]
    fn cve_id_parse_error_keeps_input() {
        let err = VulnerabilityId::parse("CVE-21-1").unwrap_err();
        assert!(matches!(err, PredictError::InvalidIdentifier { ref id } if id == "CVE-21-1"));
    }

    #[test]
    fn cve_id_deserialize_validates() {
        let id: VulnerabilityId = serde_json::from_str("\"cve-2019-0001\"").expect("valid");
        assert_eq!(id.to_string(), "CVE-2019-0001");
        assert!(serde_json::from_str::<VulnerabilityId>("\"nope\"").is_err());
    }

    #[test]
    fn classified_link_serialization() {
        let link = ClassifiedLink::Opaque {
            url: "https://example.com/patch.diff".into(),
        };
        let json = serde_json::to_string(&link).expect("serialize");
        assert!(json.contains("\"kind\":\"opaque\""));
        assert_eq!(link.original_url(), "https://example.com/patch.diff");
        assert!(link.as_commit().is_none());
    }

    #[test]
    fn landing_url_is_first_commit() {
        let commit = |hash: &str| CommitLink {
            original_url: format!("https://github.com/o/r/commit/{hash}"),
            canonical_url: format!("/cve/CVE-2020-0001/info/o/r/{hash}"),
            repo_owner: "o".into(),
            repo_name: "r".into(),
            commit_hash: hash.into(),
            origin: LinkOrigin::GitHubDirect,
        };
        let mut record = CveRecord {
            id: VulnerabilityId::parse("CVE-2020-0001").unwrap(),
            description: String::new(),
            commit_links: vec![],
            opaque_links: vec!["https://example.com".into()],
        };
        assert_eq!(record.landing_url(), None);

        record.commit_links = vec![commit("abcde"), commit("12345")];
        assert_eq!(record.landing_url(), Some("/cve/CVE-2020-0001/info/o/r/abcde"));
    }
}
