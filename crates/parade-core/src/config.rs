use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Hosted backend used when no override is configured.
pub const DEFAULT_BACKEND_URL: &str = "https://will-it-rain-on-my-parade-e1yj.onrender.com";
pub const DEFAULT_WEATHERAPI_URL: &str = "http://api.weatherapi.com/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    /// Backend the `/api/proxy` endpoint forwards to
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Direct WeatherAPI access for `/api/weather`
    #[serde(default)]
    pub weather_api: WeatherApiConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub backend_url: String,

    /// Upstream request timeout. Unset means the transport default (none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProxyConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherApiConfig {
    pub base_url: String,

    /// Never written to disk; read from `WEATHER_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl WeatherApiConfig {
    /// Check if an API key is present and not blank
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHERAPI_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Maximum in-flight requests when building the hourly trend
    #[serde(default = "default_hourly_concurrency")]
    pub hourly_concurrency: usize,

    /// Number of days in the multi-day outlook
    #[serde(default = "default_outlook_days")]
    pub outlook_days: u32,

    /// Time of day (HH:mm) preselected for forecast and recommendation requests
    #[serde(default = "default_time")]
    pub default_time: String,
}

fn default_hourly_concurrency() -> usize {
    8
}

fn default_outlook_days() -> u32 {
    5
}

fn default_time() -> String {
    "14:00".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            hourly_concurrency: default_hourly_concurrency(),
            outlook_days: default_outlook_days(),
            default_time: default_time(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parade")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            server: ServerConfig::default(),
            proxy: ProxyConfig::default(),
            weather_api: WeatherApiConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if none exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults if missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Apply overrides from a key lookup (the process environment in production).
    ///
    /// `PARADE_BACKEND_URL` wins over `BACKEND_URL`. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("PARADE_BACKEND_URL").or_else(|| get("BACKEND_URL")) {
            self.proxy.backend_url = url;
        }
        if let Some(key) = get("WEATHER_API_KEY") {
            self.weather_api.api_key = Some(key);
        }
        if let Some(addr) = get("PARADE_BIND") {
            self.server.bind_addr = addr;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.proxy.backend_url, "proxy.backend_url", &mut result);
        self.validate_url(
            &self.weather_api.base_url,
            "weather_api.base_url",
            &mut result,
        );

        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            result.add_error(
                "server.bind_addr",
                format!("Not a socket address: {}", self.server.bind_addr),
            );
        }

        if self.proxy.timeout_secs == Some(0) {
            result.add_error("proxy.timeout_secs", "Timeout must be greater than 0");
        }

        if self.dashboard.hourly_concurrency == 0 {
            result.add_error(
                "dashboard.hourly_concurrency",
                "Hourly concurrency must be greater than 0",
            );
        } else if self.dashboard.hourly_concurrency > 24 {
            result.add_warning(
                "dashboard.hourly_concurrency",
                "More than 24 concurrent requests has no effect",
            );
        }

        if self.dashboard.outlook_days == 0 {
            result.add_warning("dashboard.outlook_days", "Multi-day outlook disabled (0 days)");
        }

        if !is_hh_mm(&self.dashboard.default_time) {
            result.add_error(
                "dashboard.default_time",
                format!("Expected HH:mm, got: {}", self.dashboard.default_time),
            );
        }

        if !self.weather_api.is_configured() {
            result.add_warning(
                "weather_api.api_key",
                "WeatherAPI key not configured - /api/weather will return 500",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("parade");

        Ok(config_dir.join("config.toml"))
    }
}

fn is_hh_mm(value: &str) -> bool {
    let Some((h, m)) = value.split_once(':') else {
        return false;
    };
    let valid = |s: &str, max: u32| {
        s.len() == 2 && s.parse::<u32>().is_ok_and(|n| n <= max)
    };
    valid(h, 23) && valid(m, 59)
}
