//! # YRB Scenario Backend
//!
//! Scenario resolution and multi-scenario series aggregation for the Yellow
//! River Basin dashboard.
//!
//! A user adjusts seven scenario parameters. Each adjustment is translated
//! into backend filter constraints, resolved against the scenario catalog,
//! and turned into one normalized series per variable: a single line when
//! exactly one scenario matches, a mean with min/max envelope when several
//! do.
//!
//! ## Architecture
//!
//! - [`params`]: Parameter store with change notification, and the filter translator
//! - [`client`]: The [`SeriesClient`](client::SeriesClient) boundary, an in-memory catalog and a remote client
//! - [`services`]: Resolver, aggregator, comparison, statistics, cache and the orchestrating pipeline
//! - [`models`]: Series, scenario, climate and time window types
//! - [`config`]: TOML configuration with environment overrides
//! - [`http`]: Axum-based REST API (feature `http-server`)

// SeriesError carries a context block for diagnostics.
#![allow(clippy::result_large_err)]

pub mod client;
pub mod config;
pub mod models;
pub mod params;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
