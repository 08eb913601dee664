//! Integration test suite for fsroute
//!
//! End-to-end tests over real layer trees in temporary directories. Every
//! resolution scenario runs in both index modes.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: override policy, chain order, parent chains, cycles
//! - **mixins**: mixin merging and its failure modes
//! - **parent_layer**: cross-layer lookups
//! - **loader**: custom artifact loaders and their failures
//! - **rendering**: Tera evaluator and call context construction
//! - **cli**: the `fsroute` binary

mod common;

mod loader;
mod mixins;
mod parent_layer;
mod rendering;
mod resolution;
