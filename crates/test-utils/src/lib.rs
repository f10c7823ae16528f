//! Shared test utilities for the scene workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Archive object names and listing documents
//! - A small NetCDF scene writer for synthetic ABI-like granules
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
