//! Path-based routing for canonical in-app URLs.
//!
//! Renders the two page shapes the presentation layer serves:
//! - `{base}/cve/{id}/info/{owner}/{repo}/{commit}`
//! - `{base}/cve/{id}/blame/{owner}/{repo}/{commit}/{file}`
//!
//! Every segment is percent-encoded, so file paths like `src/a.c` become a
//! single `src%2Fa.c` segment.

use std::sync::LazyLock;

use predict_shared::{PredictError, Result, RouteTarget, Router};
use url::Url;

/// Throwaway origin used to build paths when no absolute base is configured.
static RELATIVE_ROOT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://relative.invalid/").expect("relative root url"));

/// [`Router`] producing `/cve/...` paths under a configurable base.
#[derive(Debug, Clone)]
pub struct PathRouter {
    base: Url,
    absolute: bool,
}

impl PathRouter {
    /// Create a router under `base_path`: empty, a path prefix such as
    /// `/predict`, or an absolute URL such as `https://predict.example.org`.
    pub fn new(base_path: &str) -> Result<Self> {
        let trimmed = base_path.trim();
        if let Ok(url) = Url::parse(trimmed) {
            if url.cannot_be_a_base() {
                return Err(PredictError::config(format!(
                    "routes.base_path {trimmed:?} cannot hold path segments"
                )));
            }
            return Ok(Self {
                base: url,
                absolute: true,
            });
        }

        let prefix = format!("/{}", trimmed.trim_start_matches('/'));
        let base = RELATIVE_ROOT.join(&prefix).map_err(|e| {
            PredictError::config(format!("invalid routes.base_path {trimmed:?}: {e}"))
        })?;
        Ok(Self {
            base,
            absolute: false,
        })
    }
}

impl Default for PathRouter {
    fn default() -> Self {
        Self {
            base: RELATIVE_ROOT.clone(),
            absolute: false,
        }
    }
}

impl Router for PathRouter {
    fn route(&self, target: &RouteTarget<'_>) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("cve").push(target.cve_id);
            match target.file_name {
                Some(file) => {
                    segments.push("blame");
                    segments.extend([target.repo_owner, target.repo_name, target.commit, file]);
                }
                None => {
                    segments.push("info");
                    segments.extend([target.repo_owner, target.repo_name, target.commit]);
                }
            }
        }

        if self.absolute {
            url.to_string()
        } else {
            url.path().to_string()
        }
    }
}
