//! River level snapshot crawler.
//!
//! Pulls the current water level files for every prefecture from
//! k.river.go.jp, enriches each station observation with place names and
//! warning/flood flags, and publishes an hour-bucketed JSON snapshot plus a
//! `latest.json` copy for the viewer.

pub mod aggregate;
pub mod alert;
pub mod config;
pub mod digest;
pub mod enrich;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod reference;
