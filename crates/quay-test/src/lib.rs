//! Quay Test - Shared test utilities for the Quay host.
//!
//! This crate provides archive builders, a mock template engine and common
//! fixtures that can be used across Quay crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! quay-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use quay_test::{SarBuilder, test_config};
//!
//! #[test]
//! fn test_deploy() {
//!     let dir = tempfile::tempdir().unwrap();
//!     let archive = SarBuilder::new("shop")
//!         .file("public/index.html", "<h1>shop</h1>")
//!         .write_to(dir.path());
//!     // install `archive` ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod archive;
pub mod fixtures;
pub mod mocks;

pub use archive::*;
pub use fixtures::*;
pub use mocks::*;
