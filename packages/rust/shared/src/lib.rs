//! Shared types, error model, routing seam, and configuration for Predict.
//!
//! This crate is the foundation depended on by all other Predict crates.
//! It provides:
//! - [`PredictError`] — the unified error type
//! - Domain types ([`VulnerabilityId`], [`CommitLink`], [`CveRecord`],
//!   [`Annotation`], [`ConsensusBlock`])
//! - The [`Router`] trait used to build canonical in-app URLs
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod routing;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, MirrorRepo, NvdConfig, RoutesConfig, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PredictError, Result};
pub use routing::{RouteTarget, Router};
pub use types::{
    Agreement, Annotation, AnnotationGroup, ClassifiedLink, CommitLink, ConsensusBlock,
    ConsensusEntry, CveRecord, LinkOrigin, RawMetadata, VulnerabilityId,
};
