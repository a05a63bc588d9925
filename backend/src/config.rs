//! Application configuration file support.
//!
//! Configuration is read from a TOML file (`scenarios.toml`), every field
//! falling back to a default, and then selectively overridden from the
//! environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::client::{ClientType, SeriesError, SeriesResult};
use crate::models::{TimeWindow, DEFAULT_END_YEAR, DEFAULT_START_YEAR};
use crate::params::{FilterTranslator, ParameterKey, ParameterSnapshot, ParameterValue};

/// File names searched by [`AppConfig::from_default_location`], in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 3] =
    ["scenarios.toml", "backend/scenarios.toml", "../scenarios.toml"];

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub series: SeriesSettings,
    #[serde(default)]
    pub server: ServerSettings,
    /// Initial parameter values overriding the dashboard defaults.
    #[serde(default)]
    pub parameters: BTreeMap<ParameterKey, ParameterValue>,
}

/// Scenario source selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(rename = "type", default = "default_client_type")]
    pub client_type: String,
    /// JSON catalog loaded by the local client.
    #[serde(default)]
    pub data_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            client_type: default_client_type(),
            data_path: None,
        }
    }
}

/// Remote scenario service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Series cache bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached series before the least recently used is evicted.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Keep every entry for the life of the process.
    #[serde(default)]
    pub unbounded: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            unbounded: false,
        }
    }
}

impl CacheSettings {
    /// Effective capacity, `None` when unbounded.
    pub fn effective_capacity(&self) -> Option<usize> {
        if self.unbounded {
            None
        } else {
            Some(self.capacity)
        }
    }
}

/// Series query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSettings {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    #[serde(default = "default_start_year")]
    pub baseline_year: i32,
    /// Ask the source to pre-aggregate multi-scenario results.
    #[serde(default = "default_aggregate")]
    pub aggregate: bool,
    /// Water-transfer toggle used when that parameter is left open.
    #[serde(default)]
    pub water_transfer_default: bool,
    /// Variables refreshed in the background after every parameter update.
    #[serde(default)]
    pub watch: Vec<String>,
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            baseline_year: default_start_year(),
            aggregate: default_aggregate(),
            water_transfer_default: false,
            watch: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_client_type() -> String {
    "local".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    256
}

fn default_start_year() -> i32 {
    DEFAULT_START_YEAR
}

fn default_end_year() -> i32 {
    DEFAULT_END_YEAR
}

fn default_aggregate() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` if the file was read, parsed and validated
    /// * `Err(SeriesError::Configuration)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> SeriesResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SeriesError::configuration(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> SeriesResult<Self> {
        let config: AppConfig = toml::from_str(content).map_err(|e| {
            SeriesError::configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the first of [`DEFAULT_CONFIG_PATHS`] that exists.
    pub fn from_default_location() -> SeriesResult<Self> {
        match Self::find_default_path() {
            Some(path) => Self::from_file(path),
            None => Err(SeriesError::configuration(
                "No scenarios.toml found in standard locations",
            )),
        }
    }

    pub fn find_default_path() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Configuration for a process: the default file if one exists,
    /// otherwise built-in defaults, then environment overrides.
    pub fn load() -> SeriesResult<Self> {
        let config = match Self::find_default_path() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()
    }

    /// Apply `SERIES_CLIENT_TYPE`, `SERIES_API_URL`, `SERIES_CACHE_CAPACITY`,
    /// `HOST` and `PORT` from the process environment.
    pub fn apply_env_overrides(self) -> SeriesResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(mut self, lookup: F) -> SeriesResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SERIES_API_URL") {
            self.http.base_url = url;
            // A service URL alone selects the remote client.
            if lookup("SERIES_CLIENT_TYPE").is_none() {
                self.client.client_type = "http".to_string();
            }
        }
        if let Some(client_type) = lookup("SERIES_CLIENT_TYPE") {
            self.client.client_type = client_type;
        }
        if let Some(capacity) = lookup("SERIES_CACHE_CAPACITY") {
            match parse_capacity(&capacity)? {
                Some(capacity) => {
                    self.cache.capacity = capacity;
                    self.cache.unbounded = false;
                }
                None => self.cache.unbounded = true,
            }
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| {
                SeriesError::configuration(format!("Invalid PORT value '{}'", port))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> SeriesResult<()> {
        self.client_type()?;
        self.window()?;
        if self.http.timeout_secs == 0 {
            return Err(SeriesError::configuration(
                "http.timeout_secs must be greater than zero",
            ));
        }
        if self.cache.capacity == 0 && !self.cache.unbounded {
            return Err(SeriesError::configuration(
                "cache.capacity must be greater than zero; set cache.unbounded instead",
            ));
        }
        if let Some((key, _)) = self.parameters.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SeriesError::configuration(format!(
                "parameter {} must be finite",
                key
            )));
        }
        Ok(())
    }

    pub fn client_type(&self) -> SeriesResult<ClientType> {
        ClientType::from_str(&self.client.client_type).map_err(SeriesError::configuration)
    }

    pub fn window(&self) -> SeriesResult<TimeWindow> {
        TimeWindow::new(self.series.start_year, self.series.end_year)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn translator(&self) -> FilterTranslator {
        FilterTranslator::new(self.series.water_transfer_default)
    }

    /// Dashboard defaults overlaid with the configured parameters.
    pub fn initial_snapshot(&self) -> ParameterSnapshot {
        self.parameters
            .iter()
            .fold(ParameterSnapshot::defaults(), |snapshot, (key, value)| {
                snapshot.with(*key, value.clone())
            })
    }
}

fn parse_capacity(value: &str) -> SeriesResult<Option<usize>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("unbounded") {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| {
        SeriesError::configuration(format!("Invalid SERIES_CACHE_CAPACITY value '{}'", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.client_type().unwrap(), ClientType::Local);
        assert_eq!(config.window().unwrap(), TimeWindow::default());
        assert_eq!(config.cache.effective_capacity(), Some(256));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[client]
type = "http"

[http]
base_url = "http://scenarios.internal:8000"
timeout_secs = 10

[cache]
capacity = 64

[series]
start_year = 2025
end_year = 2060
baseline_year = 2025
aggregate = false
watch = ["YRB available surface water", "YRB WSI"]

[parameters]
climate_scenario = 2
fertility = "any"
water_transfer = true
"#;
        let config = AppConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.client_type().unwrap(), ClientType::Http);
        assert_eq!(config.http.base_url, "http://scenarios.internal:8000");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.effective_capacity(), Some(64));
        assert!(!config.series.aggregate);
        assert_eq!(config.series.watch, vec!["YRB available surface water", "YRB WSI"]);

        let snapshot = config.initial_snapshot();
        assert_eq!(
            snapshot.get(ParameterKey::ClimateScenario),
            &ParameterValue::Fixed(2.0)
        );
        assert!(snapshot.get(ParameterKey::Fertility).is_any());
        assert_eq!(
            snapshot.get(ParameterKey::WaterTransfer),
            &ParameterValue::Fixed(1.0)
        );
        assert_eq!(
            snapshot.get(ParameterKey::DietPattern),
            ParameterSnapshot::defaults().get(ParameterKey::DietPattern)
        );
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let inverted = "[series]\nstart_year = 2100\nend_year = 2020\n";
        assert_eq!(
            AppConfig::from_toml_str(inverted).unwrap_err().code(),
            "CONFIGURATION_ERROR"
        );
        assert!(AppConfig::from_toml_str("[client]\ntype = \"postgres\"\n").is_err());
        assert!(AppConfig::from_toml_str("[cache]\ncapacity = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[parameters]\nunknown_knob = 1\n").is_err());
        assert!(AppConfig::from_toml_str("not toml at all [").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\ncapacity = 8").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cache.effective_capacity(), Some(8));

        let err = AppConfig::from_file("/definitely/missing/scenarios.toml").unwrap_err();
        assert!(err.message().contains("Failed to read config file"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .apply_overrides(lookup(&[
                ("SERIES_API_URL", "http://remote:9000"),
                ("SERIES_CACHE_CAPACITY", "16"),
                ("HOST", "127.0.0.1"),
                ("PORT", "9090"),
            ]))
            .unwrap();

        assert_eq!(config.client_type().unwrap(), ClientType::Http);
        assert_eq!(config.http.base_url, "http://remote:9000");
        assert_eq!(config.cache.effective_capacity(), Some(16));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_explicit_client_type_wins_over_url() {
        let config = AppConfig::default()
            .apply_overrides(lookup(&[
                ("SERIES_API_URL", "http://remote:9000"),
                ("SERIES_CLIENT_TYPE", "local"),
            ]))
            .unwrap();
        assert_eq!(config.client_type().unwrap(), ClientType::Local);
    }

    #[test]
    fn test_bad_overrides_are_rejected() {
        assert!(AppConfig::default()
            .apply_overrides(lookup(&[("PORT", "eighty")]))
            .is_err());
        assert!(AppConfig::default()
            .apply_overrides(lookup(&[("SERIES_CACHE_CAPACITY", "-1")]))
            .is_err());
        let unbounded = AppConfig::default()
            .apply_overrides(lookup(&[("SERIES_CACHE_CAPACITY", "none")]))
            .unwrap();
        assert_eq!(unbounded.cache.effective_capacity(), None);

        let from_file = AppConfig::from_toml_str("[cache]\nunbounded = true\n").unwrap();
        assert_eq!(from_file.cache.effective_capacity(), None);
    }
}
