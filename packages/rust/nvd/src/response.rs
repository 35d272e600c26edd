//! NVD CVE API 2.0 response format.
//!
//! Only the fields Predict reads are modelled:
//! - `vulnerabilities[].cve.id`
//! - `vulnerabilities[].cve.descriptions[]` (`lang`, `value`)
//! - `vulnerabilities[].cve.references[].url`

use predict_shared::{PredictError, RawMetadata, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CveResponse {
    #[serde(default)]
    vulnerabilities: Vec<VulnerabilityItem>,
}

#[derive(Debug, Deserialize)]
struct VulnerabilityItem {
    cve: CveItem,
}

#[derive(Debug, Deserialize)]
struct CveItem {
    id: String,
    #[serde(default)]
    descriptions: Vec<LangString>,
    #[serde(default)]
    references: Vec<Reference>,
}

#[derive(Debug, Deserialize)]
struct LangString {
    lang: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Reference {
    url: String,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a CVE API response body for `cve_id`.
///
/// Returns `Ok(None)` when the response lists no vulnerability with that id.
/// The English description is preferred; otherwise the first one is used.
pub(crate) fn parse_cve_response(cve_id: &str, body: &str) -> Result<Option<RawMetadata>> {
    let response: CveResponse = serde_json::from_str(body)
        .map_err(|e| PredictError::parse(format!("{cve_id}: malformed NVD response: {e}")))?;

    let Some(item) = response
        .vulnerabilities
        .into_iter()
        .map(|v| v.cve)
        .find(|cve| cve.id.eq_ignore_ascii_case(cve_id))
    else {
        return Ok(None);
    };

    let description = item
        .descriptions
        .iter()
        .find(|d| d.lang == "en")
        .or_else(|| item.descriptions.first())
        .map(|d| d.value.clone())
        .unwrap_or_default();

    let links = item.references.into_iter().map(|r| r.url).collect();

    Ok(Some(RawMetadata { description, links }))
}
