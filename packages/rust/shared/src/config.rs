//! Application configuration for Predict.
//!
//! User config lives at `~/.predict/predict.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PredictError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "predict.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".predict";

// ---------------------------------------------------------------------------
// Config structs (matching predict.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// NVD metadata source settings.
    #[serde(default)]
    pub nvd: NvdConfig,

    /// Canonical URL settings.
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Annotation database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Extra or overriding forge hosts mirrored on GitHub, keyed by host.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mirrors: BTreeMap<String, MirrorRepo>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Username whose annotations are the comparison baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_user: Option<String>,
}

/// `[nvd]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvdConfig {
    /// CVE API endpoint (queried with `?cveId=`).
    #[serde(default = "default_nvd_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the env var holding an NVD API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for NvdConfig {
    fn default() -> Self {
        Self {
            base_url: default_nvd_base_url(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_nvd_base_url() -> String {
    "https://services.nvd.nist.gov/rest/json/cves/2.0".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_api_key_env() -> String {
    "NVD_API_KEY".into()
}

/// `[routes]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Prefix prepended to every in-app path (e.g. `https://predict.example.org`).
    #[serde(default)]
    pub base_path: String,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the annotation database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.predict/annotations.db".into()
}

/// `[mirrors."host"]` entry: the GitHub repository a forge host mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRepo {
    /// GitHub owner of the mirror.
    pub owner: String,
    /// GitHub repository name of the mirror.
    pub repo: String,
}

impl StorageConfig {
    /// The database path with a leading `~/` expanded to the home directory.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        expand_home(&self.db_path)
    }
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| PredictError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.predict/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PredictError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.predict/predict.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PredictError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PredictError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PredictError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PredictError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PredictError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

impl AppConfig {
    /// Reject values that would make the collaborators misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.nvd.base_url.trim().is_empty() {
            return Err(PredictError::config("nvd.base_url must not be empty"));
        }
        if self.nvd.timeout_secs == 0 {
            return Err(PredictError::config("nvd.timeout_secs must be positive"));
        }
        for (host, repo) in &self.mirrors {
            if host.is_empty() || repo.owner.is_empty() || repo.repo.is_empty() {
                return Err(PredictError::config(format!(
                    "mirror entry {host:?} needs a host, owner and repo"
                )));
            }
        }
        Ok(())
    }

    /// Read the NVD API key from the configured env var, if set and non-empty.
    pub fn nvd_api_key(&self) -> Option<String> {
        std::env::var(&self.nvd.api_key_env)
            .ok()
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("NVD_API_KEY"));
        assert!(!toml_str.contains("mirrors"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.nvd.timeout_secs, 15);
        assert_eq!(parsed.storage.db_path, "~/.predict/annotations.db");
        assert!(parsed.defaults.focal_user.is_none());
    }

    #[test]
    fn config_with_mirrors() {
        let toml_str = r#"
[defaults]
focal_user = "jbelke"

[routes]
base_path = "https://predict.example.org"

[mirrors."git.example.org"]
owner = "example"
repo = "project"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.defaults.focal_user.as_deref(), Some("jbelke"));
        assert_eq!(config.routes.base_path, "https://predict.example.org");
        assert_eq!(
            config.mirrors.get("git.example.org"),
            Some(&MirrorRepo {
                owner: "example".into(),
                repo: "project".into()
            })
        );
    }

    #[test]
    fn invalid_mirror_rejected() {
        let toml_str = r#"
[mirrors."git.example.org"]
owner = ""
repo = "project"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("git.example.org"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.nvd.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn absolute_db_path_untouched() {
        let storage = StorageConfig {
            db_path: "/var/lib/predict/annotations.db".into(),
        };
        assert_eq!(
            storage.resolved_db_path().expect("resolve"),
            PathBuf::from("/var/lib/predict/annotations.db")
        );
    }

    #[test]
    fn missing_api_key_is_none() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.nvd.api_key_env = "PREDICT_TEST_NONEXISTENT_KEY_12345".into();
        assert!(config.nvd_api_key().is_none());
    }
}
