//! Annotation grouping and consensus resolution.
//!
//! This crate provides:
//! - [`grouper`] — stable partition of annotation rows by vulnerability id
//! - [`ConsensusEngine`] — focal-user promotion, display links, and
//!   agreement scoring per group

pub mod engine;
pub mod grouper;

pub use engine::ConsensusEngine;
pub use grouper::group;
