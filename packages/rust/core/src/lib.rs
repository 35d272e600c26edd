//! Orchestration for Predict.
//!
//! This crate ties the metadata and annotation collaborators to the link
//! classifier and the consensus engine:
//! - [`lookup::lookup_cve`] — validate id, fetch metadata, build a record
//! - [`resolution::consensus_for`] — read annotations, group, resolve
//! - [`routes::PathRouter`] — the default routing function

pub mod lookup;
pub mod resolution;
pub mod routes;
pub mod sources;

pub use lookup::lookup_cve;
pub use resolution::consensus_for;
pub use routes::PathRouter;
pub use sources::{AnnotationSource, MetadataSource};
