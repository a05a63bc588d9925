//! HTTP server module.
//!
//! This module exposes the scenario pipeline as a REST API over axum. The
//! handlers stay thin: every request is served by the shared
//! [`SeriesPipeline`](crate::services::SeriesPipeline) held in [`AppState`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Query parsing and validation                           │
//! │  - CORS, compression, error mapping                       │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Services (pipeline, comparison, statistics, cache)       │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  SeriesClient (LocalCatalog / HttpSeriesClient)           │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
