//! Vulnerability metadata from the NVD CVE API.
//!
//! This is the metadata collaborator: it turns a validated
//! [`VulnerabilityId`] into the raw description and reference links that the
//! record builder normalizes.
//! Absence upstream is `Ok(None)`, never an error.

mod response;

use std::time::Duration;

use predict_shared::{NvdConfig, PredictError, RawMetadata, Result, VulnerabilityId};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use response::parse_cve_response;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for metadata requests.
const USER_AGENT: &str = concat!("Predict/", env!("CARGO_PKG_VERSION"));

/// Header carrying the optional NVD API key.
const API_KEY_HEADER: &str = "apiKey";

// ---------------------------------------------------------------------------
// Client options
// ---------------------------------------------------------------------------

/// Configuration for the NVD client.
#[derive(Debug, Clone)]
pub struct NvdOptions {
    /// CVE API endpoint, queried as `{base_url}?cveId={id}`.
    pub base_url: String,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
    /// API key sent as the `apiKey` header, if any.
    pub api_key: Option<String>,
}

impl NvdOptions {
    /// Options from the `[nvd]` config section plus an already-resolved key.
    pub fn from_config(config: &NvdConfig, api_key: Option<String>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
            api_key,
        }
    }
}

impl Default for NvdOptions {
    fn default() -> Self {
        Self::from_config(&NvdConfig::default(), None)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Fetches vulnerability metadata over HTTP.
pub struct NvdClient {
    client: Client,
    opts: NvdOptions,
}

impl NvdClient {
    /// Build a client with the given options.
    pub fn new(opts: NvdOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| PredictError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, opts })
    }

    /// Fetch the description and reference links for `cve_id`.
    ///
    /// `Ok(None)` when NVD answers 404 or lists no matching vulnerability.
    /// Other non-success statuses and transport failures are
    /// [`PredictError::Network`]; undecodable bodies are [`PredictError::Parse`].
    #[instrument(skip_all, fields(cve_id = %cve_id))]
    pub async fn fetch(&self, cve_id: &VulnerabilityId) -> Result<Option<RawMetadata>> {
        let mut request = self
            .client
            .get(&self.opts.base_url)
            .query(&[("cveId", cve_id.as_str())]);
        if let Some(key) = &self.opts.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PredictError::Network(format!("{cve_id}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("NVD returned 404");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PredictError::Network(format!("{cve_id}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PredictError::Network(format!("{cve_id}: failed to read body: {e}")))?;

        let metadata = parse_cve_response(cve_id.as_str(), &body)?;
        match &metadata {
            Some(m) => info!(links = m.links.len(), "fetched vulnerability metadata"),
            None => debug!("NVD lists no such vulnerability"),
        }
        Ok(metadata)
    }
}
