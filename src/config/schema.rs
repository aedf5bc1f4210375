//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the upload gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Client credentials.
    pub auth: AuthConfig,

    /// Failed-authentication throttling and static address lists.
    pub throttle: ThrottleConfig,

    /// Upload modules, in the order requests are offered to them.
    pub modules: Vec<ModuleConfig>,

    /// Response shaping and body limits.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_connections: 1024,
        }
    }
}

impl ListenerConfig {
    /// Replace the host and/or port of `bind_address`.
    ///
    /// IPv6 hosts may be given with or without brackets. A host that is not
    /// an IP address is kept verbatim so validation reports it.
    pub fn override_bind(&mut self, host: Option<&str>, port: Option<u16>) {
        if host.is_none() && port.is_none() {
            return;
        }
        let current = self.bind_address.parse::<SocketAddr>().ok();
        let port = port.or(current.map(|addr| addr.port())).unwrap_or(8000);

        let ip = match host {
            Some(host) => {
                let bare = host.trim_start_matches('[').trim_end_matches(']');
                match bare.parse::<IpAddr>() {
                    Ok(ip) => ip,
                    Err(_) => {
                        self.bind_address = format!("{}:{}", host, port);
                        return;
                    }
                }
            }
            None => current
                .map(|addr| addr.ip())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        };
        self.bind_address = SocketAddr::new(ip, port).to_string();
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one request, upload included, in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for open connections, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            shutdown_grace_secs: 10,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HTTP Basic credentials; any one of them admits a request.
    pub basic: Vec<BasicCredentialConfig>,
}

/// One HTTP Basic username/password pair.
#[derive(Clone, Deserialize, Serialize)]
pub struct BasicCredentialConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicCredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentialConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Throttling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Addresses that are never blocked.
    pub allow: Vec<String>,

    /// Addresses that are always dropped. Wins over `allow`.
    pub deny: Vec<String>,

    /// Failed attempts before an address is blocked.
    pub failure_threshold: u32,

    /// Seconds after the first failure until all blocks are reset.
    pub block_duration_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            deny: Vec::new(),
            failure_threshold: 5,
            block_duration_secs: 600,
        }
    }
}

/// Upload module definitions, tagged by `type`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModuleConfig {
    Gpg(GpgModuleConfig),
}

/// GPG decryption module.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GpgModuleConfig {
    /// Pre-shared symmetric passphrase.
    pub passphrase: String,

    /// Directory that receives decrypted uploads.
    pub output_dir: PathBuf,

    /// gpg binary to run.
    pub gpg_executable: String,

    /// Exact paths this module claims (case-insensitive).
    pub paths: Vec<String>,

    /// Path prefixes this module claims (case-sensitive).
    pub path_prefixes: Vec<String>,

    /// Maximum time for one decryption, in seconds.
    pub timeout_secs: u64,

    /// Headers added to this module's responses.
    pub additional_headers: BTreeMap<String, String>,
}

impl Default for GpgModuleConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            output_dir: PathBuf::from("uploads"),
            gpg_executable: "gpg".to_string(),
            paths: vec![
                String::new(),
                "/".to_string(),
                "/gpg".to_string(),
                "/gpg/".to_string(),
            ],
            path_prefixes: Vec::new(),
            timeout_secs: 60,
            additional_headers: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for GpgModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpgModuleConfig")
            .field("passphrase", &"[REDACTED]")
            .field("output_dir", &self.output_dir)
            .field("gpg_executable", &self.gpg_executable)
            .field("paths", &self.paths)
            .field("path_prefixes", &self.path_prefixes)
            .field("timeout_secs", &self.timeout_secs)
            .field("additional_headers", &self.additional_headers)
            .finish()
    }
}

/// Transport adapter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Response headers that are never sent (case-insensitive).
    pub suppress_headers: Vec<String>,

    /// Body used for transport-level errors (400, 413, 415, 501).
    pub error_body: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024 * 1024, // 16MB
            suppress_headers: vec!["server".to_string()],
            error_body: String::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
