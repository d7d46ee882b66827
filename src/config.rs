//! Storage configuration.
//!
//! This module provides the settings value object consumed by the drivers,
//! plus the pool tuning parsed from its open-ended property bag.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_DATABASE: &str = "storage";
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_LOCAL_FILE_NAME: &str = "data";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded file-based engine.
    SQLite,
    MySQL,
    /// Speaks the MySQL wire protocol, dialed under its own URI scheme.
    MariaDB,
}

impl BackendKind {
    /// All known backend kinds, in registry order.
    pub const ALL: [BackendKind; 3] = [Self::SQLite, Self::MySQL, Self::MariaDB];

    /// Get the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SQLite => "SQLite",
            Self::MySQL => "MySQL",
            Self::MariaDB => "MariaDB",
        }
    }

    /// URI scheme used when building the connection string. None for the
    /// embedded backend.
    pub fn scheme(&self) -> Option<&'static str> {
        match self {
            Self::SQLite => None,
            Self::MySQL => Some("mysql"),
            Self::MariaDB => Some("mariadb"),
        }
    }

    /// Get the default port for this backend.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::SQLite => None,
            Self::MySQL | Self::MariaDB => Some(DEFAULT_PORT),
        }
    }

    /// Check if this backend stores data in a local file.
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::SQLite)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Settings for a [`StorageManager`](crate::StorageManager).
///
/// Immutable once handed to `initialize`; [`add_property`](Self::add_property)
/// is the only mutator and feeds backend-specific pool tuning. No field is
/// validated here - an unreachable host or empty database name surfaces later
/// as a connection failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Database file path for the embedded backend, without the `.db` suffix.
    /// May contain directory components.
    pub local_file_name: String,
    /// Backend-specific pool tuning. Recognized keys are listed in
    /// [`PoolSettings::RECOGNIZED_KEYS`]; unknown keys pass through to the
    /// connection URI query string.
    #[serde(default)]
    pub extra_properties: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a configuration for the given backend with every other field
    /// defaulted.
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            local_file_name: DEFAULT_LOCAL_FILE_NAME.to_string(),
            extra_properties: HashMap::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_local_file_name(mut self, name: impl Into<String>) -> Self {
        self.local_file_name = name.into();
        self
    }

    /// Insert or overwrite a property used for pool configuration.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_properties.insert(key.into(), value.into());
    }

    /// Parse the pool tuning out of the property bag.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings::from_properties(&self.extra_properties)
    }

    /// Properties that are not pool tuning, in sorted order; these are
    /// appended to the connection URI for the backend driver to interpret.
    pub fn passthrough_properties(&self) -> Vec<(&str, &str)> {
        let mut props: Vec<(&str, &str)> = self
            .extra_properties
            .iter()
            .filter(|(k, _)| !PoolSettings::RECOGNIZED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        props.sort_unstable();
        props
    }
}

impl Default for StorageConfig {
    /// Defaults to the embedded backend with file name `data`.
    fn default() -> Self {
        Self::new(BackendKind::SQLite)
    }
}

/// Connection pool tuning extracted from [`StorageConfig::extra_properties`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum connections in pool (default: 10 networked, 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Whether to test connections before use (default: true)
    pub test_before_acquire: Option<bool>,
}

impl PoolSettings {
    /// Property keys consumed for pool tuning; everything else passes
    /// through to the connection URI.
    pub const RECOGNIZED_KEYS: &'static [&'static str] = &[
        "max_connections",
        "min_connections",
        "idle_timeout",
        "acquire_timeout",
        "test_before_acquire",
    ];

    /// Parse recognized keys from a property bag. Unparseable values are
    /// ignored.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        Self {
            max_connections: props.get("max_connections").and_then(|v| v.parse().ok()),
            min_connections: props.get("min_connections").and_then(|v| v.parse().ok()),
            idle_timeout_secs: props.get("idle_timeout").and_then(|v| v.parse().ok()),
            acquire_timeout_secs: props.get("acquire_timeout").and_then(|v| v.parse().ok()),
            test_before_acquire: props.get("test_before_acquire").and_then(|v| {
                if v.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if v.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }),
        }
    }

    /// Get max_connections with default value based on backend kind.
    pub fn max_connections_or_default(&self, is_embedded: bool) -> u32 {
        self.max_connections.unwrap_or(if is_embedded {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    /// Get test_before_acquire with default value.
    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool settings and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if min == 0 {
                return Err("min_connections must be greater than 0".to_string());
            }
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_sqlite() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, BackendKind::SQLite);
        assert_eq!(config.local_file_name, DEFAULT_LOCAL_FILE_NAME);
        assert!(config.extra_properties.is_empty());
    }

    #[test]
    fn test_backend_only_config_defaults() {
        let config = StorageConfig::new(BackendKind::MySQL);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.username, "root");
        assert!(config.password.is_empty());
    }

    #[test]
    fn test_builder_setters() {
        let config = StorageConfig::new(BackendKind::MariaDB)
            .with_host("db.internal")
            .with_port(3307)
            .with_database("inventory")
            .with_credentials("svc", "hunter2");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.database, "inventory");
        assert_eq!(config.username, "svc");
        assert_eq!(config.password, "hunter2");
    }

    #[test]
    fn test_add_property_overwrites() {
        let mut config = StorageConfig::default();
        config.add_property("max_connections", "5");
        config.add_property("max_connections", "7");
        assert_eq!(
            config.extra_properties.get("max_connections"),
            Some(&"7".to_string())
        );
    }

    #[test]
    fn test_backend_scheme_and_port() {
        assert_eq!(BackendKind::MySQL.scheme(), Some("mysql"));
        assert_eq!(BackendKind::MariaDB.scheme(), Some("mariadb"));
        assert_eq!(BackendKind::SQLite.scheme(), None);
        assert_eq!(BackendKind::MySQL.default_port(), Some(3306));
        assert!(BackendKind::SQLite.default_port().is_none());
        assert!(BackendKind::SQLite.is_embedded());
        assert!(!BackendKind::MariaDB.is_embedded());
    }

    #[test]
    fn test_pool_settings_defaults() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_connections_or_default(false), 10);
        assert_eq!(settings.max_connections_or_default(true), 1);
        assert_eq!(settings.min_connections_or_default(), 1);
        assert_eq!(settings.idle_timeout_or_default(), 600);
        assert_eq!(settings.acquire_timeout_or_default(), 30);
        assert!(settings.test_before_acquire_or_default());
    }

    #[test]
    fn test_pool_settings_from_properties() {
        let mut config = StorageConfig::new(BackendKind::MySQL);
        config.add_property("max_connections", "20");
        config.add_property("min_connections", "5");
        config.add_property("idle_timeout", "300");
        config.add_property("test_before_acquire", "FALSE");

        let settings = config.pool_settings();
        assert_eq!(settings.max_connections, Some(20));
        assert_eq!(settings.min_connections, Some(5));
        assert_eq!(settings.idle_timeout_secs, Some(300));
        assert_eq!(settings.test_before_acquire, Some(false));
        assert!(settings.acquire_timeout_secs.is_none());
    }

    #[test]
    fn test_pool_settings_invalid_values_ignored() {
        let mut config = StorageConfig::new(BackendKind::MySQL);
        config.add_property("max_connections", "lots");
        config.add_property("test_before_acquire", "yes");

        let settings = config.pool_settings();
        assert!(settings.max_connections.is_none());
        assert!(settings.test_before_acquire.is_none());
    }

    #[test]
    fn test_pool_settings_validation() {
        let settings = PoolSettings {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = PoolSettings {
            min_connections: Some(10),
            max_connections: Some(5),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.contains("cannot exceed"));

        assert!(PoolSettings::default().validate().is_ok());
    }

    #[test]
    fn test_passthrough_properties_exclude_pool_keys() {
        let mut config = StorageConfig::new(BackendKind::MySQL);
        config.add_property("max_connections", "20");
        config.add_property("charset", "utf8mb4");
        config.add_property("ssl-mode", "DISABLED");

        let props = config.passthrough_properties();
        assert_eq!(props, vec![("charset", "utf8mb4"), ("ssl-mode", "DISABLED")]);
    }
}
