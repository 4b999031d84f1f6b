//! `ragctx` crate (library surface).
//!
//! The primary entrypoint is the `ragctx` binary. This module re-exports the workspace
//! crates so embedders can depend on one package.

pub use ragctx_core as core;
pub use ragctx_local as local;
