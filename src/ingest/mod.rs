//! Upstream data retrieval.
//!
//! Submodules:
//! - `fetch` — HTTP GET with bounded retry and exponential backoff.
//! - `river_level` — k.river.go.jp URL construction and response unpacking.

pub mod fetch;
pub mod river_level;
