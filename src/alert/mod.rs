//! Alert classification for enriched observations.
//!
//! Submodules:
//! - `thresholds` — level coercion and warning/flood flag derivation.

pub mod thresholds;
