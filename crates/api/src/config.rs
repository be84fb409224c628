// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! Configuration is read from defaults, optional JSON files, `SERVER_*`
//! environment variables, and finally the operational variables `PORT` and
//! `MONGODB_URI`. Values are validated while loading.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use database::{ConnectOptions, DatabaseConfig, MONGODB_URI};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{ServerError, ServerResult};

const PORT: &str = "PORT";
const ENVIRONMENT: &str = "ENVIRONMENT";

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// The default port, 3000
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // re-validated in `load_with` once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Database connection string; required to start
    pub mongodb_uri: Option<String>,
    /// Drop filter paths that are not part of a schema
    pub strict_query: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: ServerPort::default_development(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
            mongodb_uri: None,
            strict_query: true,
        }
    }
}

impl ServerConfig {
    /// Create configuration from the process environment and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self::load_with(&env)
    }

    /// Load configuration from the given environment variables
    ///
    /// Sources in order, later ones overriding earlier ones:
    /// 1. Default values
    /// 2. Configuration file (`config.json`)
    /// 3. Environment-specific file (`config.{env}.json`)
    /// 4. Environment variables with `SERVER_` prefix (`SERVER_TIMEOUT_SECONDS`)
    /// 5. `PORT` and `MONGODB_URI`; empty values count as unset
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load_with(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| env.get(name).filter(|value| !value.is_empty()).cloned();
        let environment = non_empty(ENVIRONMENT).map(|value| value.to_lowercase());

        let mut config_builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", 30)?
            .set_default("environment", "development")?
            .set_default("strict_query", true)?
            .add_source(File::with_name("config.json").required(false));

        if let Some(environment) = &environment {
            config_builder = config_builder
                .add_source(File::with_name(&format!("config.{environment}.json")).required(false));
        }

        config_builder = config_builder
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone().into_iter().collect())),
            )
            .set_override_option("environment", environment)?
            .set_override_option("port", non_empty(PORT))?
            .set_override_option("mongodb_uri", non_empty(MONGODB_URI))?;

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;
        server_config.mongodb_uri = server_config.mongodb_uri.filter(|uri| !uri.is_empty());

        Ok(server_config)
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(), // let OS choose available port
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            mongodb_uri: None,
            strict_query: true,
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }

    /// Connection settings for the database
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            uri: self.mongodb_uri.clone(),
            connect_options: ConnectOptions {
                strict_query: self.strict_query,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn server_port_validation() {
        // Port 0 should only be valid in testing environment
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        assert!(ServerPort::new(3000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::load_with(&HashMap::new()).unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.timeout_seconds, TimeoutSeconds::default());
        assert_eq!(config.mongodb_uri, None);
        assert!(config.strict_query);
    }

    #[test]
    fn port_and_uri_come_from_plain_variables() {
        let config = ServerConfig::load_with(&env(&[
            ("PORT", "8080"),
            ("MONGODB_URI", "mongodb://localhost:27017/abba"),
        ]))
        .unwrap();

        assert_eq!(config.port.value(), 8080);
        assert_eq!(
            config.database_config().uri.as_deref(),
            Some("mongodb://localhost:27017/abba")
        );
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config =
            ServerConfig::load_with(&env(&[("PORT", ""), ("MONGODB_URI", "")])).unwrap();

        assert_eq!(config.port.value(), 3000);
        assert_eq!(config.mongodb_uri, None);
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = ServerConfig::load_with(&env(&[
            ("SERVER_TIMEOUT_SECONDS", "10"),
            ("SERVER_STRICT_QUERY", "false"),
            ("ENVIRONMENT", "Production"),
        ]))
        .unwrap();

        assert_eq!(config.timeout_seconds.value(), Duration::from_secs(10));
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.database_config().connect_options.strict_query);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServerConfig::load_with(&env(&[("PORT", "0")])).is_err());
        assert!(ServerConfig::load_with(&env(&[("PORT", "not-a-port")])).is_err());
        assert!(ServerConfig::load_with(&env(&[("SERVER_TIMEOUT_SECONDS", "0")])).is_err());
    }
}
