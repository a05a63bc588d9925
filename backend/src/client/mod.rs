//! Scenario series sources.
//!
//! The [`SeriesClient`] trait is the seam between the dashboard core and
//! whatever stores scenario outputs. [`LocalCatalog`] keeps everything in
//! memory; `HttpSeriesClient` (feature `http-client`) talks to the remote
//! scenario service.

pub mod error;
pub mod factory;
#[cfg(feature = "http-client")]
pub mod http;
pub mod local;
pub mod series_client;

pub use error::{ErrorContext, SeriesError, SeriesResult};
pub use factory::{ClientFactory, ClientType};
#[cfg(feature = "http-client")]
pub use http::HttpSeriesClient;
pub use local::{CatalogSnapshot, LocalCatalog};
pub use series_client::SeriesClient;
