//! Series client factory for dependency injection.
//!
//! This module creates [`SeriesClient`] instances from runtime
//! configuration: an explicit [`ClientType`], the environment, or an
//! [`AppConfig`].

use log::info;
use std::str::FromStr;
use std::sync::Arc;

use super::error::{SeriesError, SeriesResult};
#[cfg(feature = "http-client")]
use super::http::HttpSeriesClient;
use super::local::LocalCatalog;
use super::series_client::SeriesClient;
use crate::config::{AppConfig, HttpSettings};

/// Series client type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// In-memory scenario catalog
    Local,
    /// Remote scenario service over HTTP
    Http,
}

impl FromStr for ClientType {
    type Err = String;

    /// Parse client type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("local", "memory", "http", "remote")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "http" | "remote" => Ok(Self::Http),
            _ => Err(format!("Unknown client type: {}", s)),
        }
    }
}

impl ClientType {
    /// Get client type from environment variables.
    ///
    /// Reads `SERIES_CLIENT_TYPE`. Defaults to Http if `SERIES_API_URL` is
    /// set, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("SERIES_CLIENT_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("SERIES_API_URL").is_ok() {
            Self::Http
        } else {
            Self::Local
        }
    }
}

/// Factory for creating series client instances.
///
/// # Example
/// ```
/// use yrb_scenarios::client::{ClientFactory, ClientType};
/// use yrb_scenarios::config::AppConfig;
///
/// let client = ClientFactory::create(ClientType::Local, &AppConfig::default()).unwrap();
/// # let _ = client;
/// ```
pub struct ClientFactory;

impl ClientFactory {
    /// Create a client of the given type.
    ///
    /// # Arguments
    /// * `client_type` - Type of client to create
    /// * `config` - Application configuration (endpoint, timeout, catalog path)
    ///
    /// # Returns
    /// * `Ok(Arc<dyn SeriesClient>)` - Shared client instance
    /// * `Err(SeriesError::Configuration)` - If creation fails
    pub fn create(
        client_type: ClientType,
        config: &AppConfig,
    ) -> SeriesResult<Arc<dyn SeriesClient>> {
        match client_type {
            ClientType::Local => match &config.client.data_path {
                Some(path) => Ok(Arc::new(LocalCatalog::from_json_file(path)?)),
                None => Ok(Self::create_local()),
            },
            ClientType::Http => Self::create_http(&config.http),
        }
    }

    /// Create an empty in-memory catalog.
    pub fn create_local() -> Arc<dyn SeriesClient> {
        info!("Using in-memory scenario catalog");
        Arc::new(LocalCatalog::new())
    }

    /// Create a remote client.
    #[cfg(feature = "http-client")]
    pub fn create_http(settings: &HttpSettings) -> SeriesResult<Arc<dyn SeriesClient>> {
        let client = HttpSeriesClient::new(
            settings.base_url.clone(),
            std::time::Duration::from_secs(settings.timeout_secs),
        )?;
        Ok(Arc::new(client))
    }

    /// Create a remote client when the feature is disabled.
    #[cfg(not(feature = "http-client"))]
    pub fn create_http(settings: &HttpSettings) -> SeriesResult<Arc<dyn SeriesClient>> {
        let _ = settings;
        Err(SeriesError::configuration(
            "HTTP client feature not enabled",
        ))
    }

    /// Create a client from environment variables.
    pub fn from_env() -> SeriesResult<Arc<dyn SeriesClient>> {
        let config = AppConfig::default().apply_env_overrides()?;
        Self::create(ClientType::from_env(), &config)
    }

    /// Create a client from a loaded configuration.
    pub fn from_config(config: &AppConfig) -> SeriesResult<Arc<dyn SeriesClient>> {
        let client_type = config.client_type().map_err(|e| {
            SeriesError::configuration(format!("Invalid client type: {}", e.message()))
        })?;
        Self::create(client_type, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_type_from_str() {
        assert_eq!("local".parse::<ClientType>().unwrap(), ClientType::Local);
        assert_eq!("Memory".parse::<ClientType>().unwrap(), ClientType::Local);
        assert_eq!("HTTP".parse::<ClientType>().unwrap(), ClientType::Http);
        assert_eq!("remote".parse::<ClientType>().unwrap(), ClientType::Http);
        assert!("postgres".parse::<ClientType>().is_err());
    }

    #[tokio::test]
    async fn test_create_local_is_empty_and_healthy() {
        let client = ClientFactory::create(ClientType::Local, &AppConfig::default()).unwrap();
        assert!(client.health_check().await.unwrap());
        assert!(client.list_variables().await.unwrap().is_empty());
    }

    #[test]
    fn test_missing_catalog_file_fails() {
        let mut config = AppConfig::default();
        config.client.data_path = Some("/definitely/missing/catalog.json".into());
        let err = ClientFactory::from_config(&config).err().unwrap();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[cfg(not(feature = "http-client"))]
    #[test]
    fn test_http_requires_feature() {
        let err = ClientFactory::create(ClientType::Http, &AppConfig::default())
            .err()
            .unwrap();
        assert!(err.message().contains("not enabled"));
    }

    #[cfg(feature = "http-client")]
    #[test]
    fn test_create_http() {
        assert!(ClientFactory::create(ClientType::Http, &AppConfig::default()).is_ok());
    }
}
