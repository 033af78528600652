use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Client configuration. Every field has a default, so an empty file (or no
/// file at all) is a valid configuration.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct FleetGuardConfig {
    pub graphql_endpoint: String,
    /// Nominatim-compatible geocoder base URL (trailing slash required)
    pub geocoder_url: String,
    /// OSRM-compatible router base URL (trailing slash required)
    pub router_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    pub tracking: TrackingConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct TrackingConfig {
    pub max_speed_kmh: f64,
    pub tick_interval_secs: u64,
    pub recenter_zoom: u8,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// Forgotten when the process exits.
    Memory,
    /// Persisted to `SessionConfig::path`.
    File,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub path: PathBuf,
}

impl Default for FleetGuardConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: "http://localhost:8080/graphql".into(),
            geocoder_url: "https://nominatim.openstreetmap.org/".into(),
            router_url: "https://router.project-osrm.org/".into(),
            user_agent: concat!("fleetguard/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout_secs: 30,
            retry: RetryConfig::default(),
            tracking: TrackingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 100.0,
            tick_interval_secs: 8,
            recenter_zoom: 14,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            path: PathBuf::from("fleetguard-session.json"),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl TrackingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.max_speed_kmh.is_finite() || self.max_speed_kmh <= 0.0 {
            return Err(CoreError::Configuration(format!(
                "tracking.max_speed_kmh must be positive, got {}",
                self.max_speed_kmh
            )));
        }
        if self.tick_interval_secs == 0 {
            return Err(CoreError::Configuration(
                "tracking.tick_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl FleetGuardConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// HTTP client shared by the GraphQL, geocoding and routing clients.
    pub fn http_client(&self) -> Result<reqwest::Client, CoreError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout())
            .build()
            .map_err(CoreError::Network)
    }

    /// Reject values the rest of the client cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.tracking.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(CoreError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        for (name, url) in [
            ("geocoder_url", &self.geocoder_url),
            ("router_url", &self.router_url),
        ] {
            if !url.ends_with('/') {
                return Err(CoreError::Configuration(format!(
                    "{name} must end with '/', got {url}"
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<&Path> for FleetGuardConfig {
    type Error = CoreError;

    fn try_from(f: &Path) -> Result<Self, Self::Error> {
        let read = || {
            std::fs::read_to_string(f).map_err(|e| {
                CoreError::Configuration(format!("failure reading {}: {e}", f.display()))
            })
        };

        let config: Self = match f.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&read()?).map_err(|e| {
                CoreError::Configuration(format!("failure decoding {}: {e}", f.display()))
            })?,
            Some("json") => serde_json::from_str(&read()?).map_err(|e| {
                CoreError::Configuration(format!("failure decoding {}: {e}", f.display()))
            })?,
            _ => {
                return Err(CoreError::Configuration(format!(
                    "unsupported file type: {}",
                    f.display()
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tracking_constants() {
        let config = FleetGuardConfig::default();
        assert_eq!(config.tracking.max_speed_kmh, 100.0);
        assert_eq!(config.tracking.tick_interval(), Duration::from_secs(8));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert!(config.validate().is_ok());
        assert!(config.http_client().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FleetGuardConfig = toml::from_str(
            r#"
            graphql_endpoint = "https://api.example.com/graphql"

            [tracking]
            max_speed_kmh = 90.0

            [session]
            backend = "file"
            path = "/tmp/session.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.graphql_endpoint, "https://api.example.com/graphql");
        assert_eq!(config.tracking.max_speed_kmh, 90.0);
        assert_eq!(config.tracking.tick_interval_secs, 8);
        assert_eq!(config.session.backend, SessionBackend::File);
        assert_eq!(config.retry.base_delay_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FleetGuardConfig::default();
        config.tracking.max_speed_kmh = 0.0;
        assert!(config.validate().is_err());

        let mut config = FleetGuardConfig::default();
        config.router_url = "https://router.project-osrm.org".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("fleetguard-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let json = dir.join("client.json");
        std::fs::write(&json, r#"{ "retry": { "max_attempts": 5 } }"#).unwrap();
        let config = FleetGuardConfig::try_from(json.as_path()).unwrap();
        assert_eq!(config.retry.max_attempts, 5);

        let yaml = dir.join("client.yaml");
        std::fs::write(&yaml, "retry: {}").unwrap();
        assert!(FleetGuardConfig::try_from(yaml.as_path()).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
