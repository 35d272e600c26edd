//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use predict_consensus::ConsensusEngine;
use predict_core::{PathRouter, consensus_for, lookup_cve};
use predict_links::{LinkClassifier, MirrorTable};
use predict_nvd::{NvdClient, NvdOptions};
use predict_shared::{
    Annotation, AppConfig, Router, VulnerabilityId, init_config, load_config, load_config_from,
};
use predict_storage::Storage;
use tracing::info;

use crate::render;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Predict — normalize vulnerability references and reconcile annotations.
#[derive(Parser)]
#[command(
    name = "predict",
    version,
    about = "Look up CVEs, record where they were fixed and introduced, and compare annotations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.predict/predict.toml.
    #[arg(long, global = true, env = "PREDICT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch a CVE and show its description and classified reference links.
    Cve {
        /// CVE identifier (case-insensitive).
        id: String,

        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify reference URLs offline, as they would appear on a CVE page.
    Classify {
        /// CVE identifier the links belong to.
        id: String,

        /// URLs to classify.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record (or replace) a user's fix/introduction claim for a CVE.
    Annotate(AnnotateArgs),

    /// Show annotation consensus against a focal user.
    Resolve {
        /// Focal username (defaults to `defaults.focal_user` from config).
        #[arg(short, long)]
        user: Option<String>,

        /// Limit to a single CVE.
        #[arg(long)]
        cve: Option<String>,

        /// Annotation database (defaults to `storage.db_path` from config).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print blocks as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `predict annotate`.
#[derive(Args)]
pub(crate) struct AnnotateArgs {
    /// CVE identifier.
    #[arg(long)]
    pub cve: String,

    /// Author of the claim (defaults to `defaults.focal_user` from config).
    #[arg(short, long)]
    pub user: Option<String>,

    /// Repository owner on GitHub.
    #[arg(long)]
    pub owner: String,

    /// Repository name on GitHub.
    #[arg(long)]
    pub repo: String,

    /// Commit that fixed the vulnerability.
    #[arg(long)]
    pub fix_commit: String,

    /// File changed by the fix.
    #[arg(long)]
    pub fix_file: String,

    /// Commit that introduced the vulnerability.
    #[arg(long)]
    pub intro_commit: String,

    /// File in which the vulnerability was introduced.
    #[arg(long)]
    pub intro_file: String,

    /// Annotation database (defaults to `storage.db_path` from config).
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "predict=info",
        1 => "predict=debug",
        _ => "predict=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Cve { id, json } => cmd_cve(config_path, &id, json).await,
        Command::Classify { id, urls, json } => cmd_classify(config_path, &id, &urls, json),
        Command::Annotate(args) => cmd_annotate(config_path, args).await,
        Command::Resolve { user, cve, db, json } => {
            cmd_resolve(config_path, user, cve.as_deref(), db, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn build_router(config: &AppConfig) -> Result<Arc<dyn Router>> {
    Ok(Arc::new(PathRouter::new(&config.routes.base_path)?))
}

fn build_classifier(config: &AppConfig) -> Result<LinkClassifier> {
    let mirrors = MirrorTable::default().with_overrides(&config.mirrors);
    Ok(LinkClassifier::new(mirrors, build_router(config)?))
}

fn focal_user(explicit: Option<String>, config: &AppConfig) -> Result<String> {
    explicit
        .or_else(|| config.defaults.focal_user.clone())
        .ok_or_else(|| eyre!("no user given: pass --user or set defaults.focal_user in the config"))
}

fn db_path(explicit: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p),
        None => Ok(config.storage.resolved_db_path()?),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_cve(config_path: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let classifier = build_classifier(&config)?;
    let client = NvdClient::new(NvdOptions::from_config(&config.nvd, config.nvd_api_key()))?;

    info!(id, base_url = %config.nvd.base_url, "looking up vulnerability");

    let spinner = spinner(&format!("Fetching {}", id.to_uppercase()));
    let result = lookup_cve(&client, &classifier, id).await;
    spinner.finish_and_clear();

    let record = result.wrap_err_with(|| format!("lookup of {id} failed"))?;
    if json {
        print_json(&record)
    } else {
        print!("{}", render::record(&record));
        Ok(())
    }
}

fn cmd_classify(config_path: Option<&Path>, id: &str, urls: &[String], json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let classifier = build_classifier(&config)?;
    let id = VulnerabilityId::parse(id)?;

    let links: Vec<_> = urls.iter().map(|u| classifier.classify(&id, u)).collect();
    if json {
        print_json(&links)
    } else {
        print!("{}", render::classified(&links));
        Ok(())
    }
}

async fn cmd_annotate(config_path: Option<&Path>, args: AnnotateArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let username = focal_user(args.user, &config)?;
    let cve_id = VulnerabilityId::parse(&args.cve)?;
    let path = db_path(args.db, &config)?;

    let annotation = Annotation {
        cve_id: cve_id.to_string(),
        username,
        repo_owner: args.owner,
        repo_name: args.repo,
        fix_commit: args.fix_commit,
        fix_file: args.fix_file,
        intro_commit: args.intro_commit,
        intro_file: args.intro_file,
    };

    let storage = Storage::open(&path).await?;
    storage.upsert_annotation(&annotation).await?;

    info!(cve_id = %cve_id, username = %annotation.username, db = %path.display(), "annotation saved");
    println!("Saved {}'s annotation for {cve_id}", annotation.username);
    Ok(())
}

async fn cmd_resolve(
    config_path: Option<&Path>,
    user: Option<String>,
    cve: Option<&str>,
    db: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let focal = focal_user(user, &config)?;
    let path = db_path(db, &config)?;

    let storage = Storage::open_readonly(&path).await?;
    let engine = ConsensusEngine::new(build_router(&config)?);
    let blocks = consensus_for(&storage, &engine, &focal, cve).await?;

    if json {
        print_json(&blocks)
    } else {
        print!("{}", render::blocks(&blocks, &focal));
        Ok(())
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_resolve() {
        let cli = Cli::parse_from(["predict", "resolve", "--user", "alice", "--cve", "CVE-2014-0160", "--json"]);
        match cli.command {
            Command::Resolve { user, cve, json, db } => {
                assert_eq!(user.as_deref(), Some("alice"));
                assert_eq!(cve.as_deref(), Some("CVE-2014-0160"));
                assert!(json);
                assert!(db.is_none());
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn cli_classify_requires_urls() {
        assert!(Cli::try_parse_from(["predict", "classify", "CVE-2014-0160"]).is_err());
    }

    #[test]
    fn focal_user_falls_back_to_config() {
        let mut config = AppConfig::default();
        assert!(focal_user(None, &config).is_err());

        config.defaults.focal_user = Some("alice".into());
        assert_eq!(focal_user(None, &config).unwrap(), "alice");
        assert_eq!(focal_user(Some("bob".into()), &config).unwrap(), "bob");
    }
}
