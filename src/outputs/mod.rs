//! Output writers for response envelopes.
//!
//! # Submodules
//!
//! - [`json`]: Writes batch and single-source envelopes to per-group JSON files

pub mod json;
