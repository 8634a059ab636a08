//! Configuration management for Floodgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{FloodgateError, Result};

/// Environment variable overriding the requests-per-window limit.
pub const ENV_RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";
/// Environment variable overriding the window length in seconds.
pub const ENV_RATE_LIMIT_WINDOW: &str = "RATE_LIMIT_WINDOW";

/// Main configuration for the Floodgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission control configuration
    #[serde(default)]
    pub admission: AdmissionConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Admission control configuration.
///
/// Fixed at limiter construction and immutable for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum requests admitted per client within one window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    /// Sliding window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Minimum interval between full sweeps of stale client state, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// Paths that bypass admission control entirely
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_seconds: default_window_seconds(),
            cleanup_interval_seconds: default_cleanup_interval(),
            exempt_paths: default_exempt_paths(),
        }
    }
}

fn default_requests_per_window() -> u32 {
    100
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_exempt_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/health/detailed".to_string(),
        "/metrics".to_string(),
    ]
}

impl FloodgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| FloodgateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment variable overrides for the admission limits.
    ///
    /// `RATE_LIMIT_REQUESTS` and `RATE_LIMIT_WINDOW` take precedence over
    /// values from the configuration file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(ENV_RATE_LIMIT_REQUESTS) {
            self.admission.requests_per_window = value.parse().map_err(|_| {
                FloodgateError::Config(format!(
                    "{} must be a positive integer, got {:?}",
                    ENV_RATE_LIMIT_REQUESTS, value
                ))
            })?;
        }

        if let Ok(value) = std::env::var(ENV_RATE_LIMIT_WINDOW) {
            self.admission.window_seconds = value.parse().map_err(|_| {
                FloodgateError::Config(format!(
                    "{} must be a positive integer, got {:?}",
                    ENV_RATE_LIMIT_WINDOW, value
                ))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.admission.requests_per_window == 0 {
            return Err(FloodgateError::Config(
                "requests_per_window must be greater than zero".to_string(),
            ));
        }
        if self.admission.window_seconds == 0 {
            return Err(FloodgateError::Config(
                "window_seconds must be greater than zero".to_string(),
            ));
        }
        if self.admission.cleanup_interval_seconds == 0 {
            return Err(FloodgateError::Config(
                "cleanup_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
