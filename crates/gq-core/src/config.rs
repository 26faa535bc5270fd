//! Configuration for GQ
//!
//! Example config:
//! ```toml
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [[servers]]
//! name = "main"
//! server_url = "ldap://ldap.example.com:389"
//! bind_dn = "cn=admin,dc=example,dc=com"
//! bind_password = "secret"
//!
//! [[servers]]
//! name = "backup"
//! server_url = "ldaps://ldap2.example.com:636"
//! cache_connections = false
//! ```

use crate::types::ServerId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GqConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl GqConfig {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: GqConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `GQ_CONFIG` when set, otherwise start empty. Logging
    /// settings can be overridden with `GQ_LOG_LEVEL` and `GQ_LOG_FORMAT`.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = match std::env::var("GQ_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(level) = std::env::var("GQ_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("GQ_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    pub fn server(&self, id: &ServerId) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == id.as_str())
    }

    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !seen.insert(server.name.as_str()) {
                return Err(crate::Error::Config(format!(
                    "Duplicate server name: {}",
                    server.name
                )));
            }
        }
        self.logging.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    fn validate(&self) -> crate::Result<()> {
        match self.format.to_ascii_lowercase().as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(crate::Error::Config(format!(
                "Unknown log format '{}' (expected pretty or json)",
                other
            ))),
        }
    }
}

/// One directory server the user can move entries from or to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Name used to refer to this server
    pub name: String,

    /// LDAP server URL (ldap:// or ldaps://)
    /// Example: "ldap://ldap.example.com:389" or "ldaps://ldap.example.com:636"
    pub server_url: String,

    /// Use STARTTLS for connection upgrade
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification (not recommended for production)
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Bind DN; empty means anonymous
    #[serde(default)]
    pub bind_dn: String,

    #[serde(default)]
    pub bind_password: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// LDAP protocol version spoken with this server
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    /// Keep the bound connection open between operations
    #[serde(default = "default_true")]
    pub cache_connections: bool,
}

fn default_timeout() -> u64 {
    10
}

fn default_protocol_version() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_url: server_url.into(),
            start_tls: false,
            skip_tls_verify: false,
            bind_dn: String::new(),
            bind_password: String::new(),
            timeout_seconds: default_timeout(),
            protocol_version: default_protocol_version(),
            cache_connections: true,
        }
    }

    pub fn id(&self) -> ServerId {
        ServerId::new(self.name.clone())
    }

    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.is_empty()
    }

    /// Native rename with a new superior needs LDAPv3.
    pub fn supports_rename(&self) -> bool {
        self.protocol_version >= 3
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::Config("Server name is required".to_string()));
        }

        let url = url::Url::parse(&self.server_url).map_err(|e| {
            crate::Error::Config(format!(
                "Server '{}' has an invalid URL '{}': {}",
                self.name, self.server_url, e
            ))
        })?;

        if url.scheme() != "ldap" && url.scheme() != "ldaps" {
            return Err(crate::Error::Config(format!(
                "Server '{}' URL must start with ldap:// or ldaps://",
                self.name
            )));
        }

        if self.start_tls && url.scheme() == "ldaps" {
            return Err(crate::Error::Config(format!(
                "Server '{}' cannot use STARTTLS over ldaps://",
                self.name
            )));
        }

        if !(2..=3).contains(&self.protocol_version) {
            return Err(crate::Error::Config(format!(
                "Server '{}' has unsupported protocol version {}",
                self.name, self.protocol_version
            )));
        }

        Ok(())
    }
}
